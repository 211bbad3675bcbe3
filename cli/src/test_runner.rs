//! Runner for `.test.nml` files: TOML frontmatter between `---` lines,
//! followed by the NML source under test.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use compiler::action::ReplacementType;
use compiler::nfo::to_nfo_string;
use compiler::{ActionSetId, CompileWarning, CompilerConfig};

const TEST_SUFFIX: &str = ".test.nml";

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Action sets known before compilation, by name.
    #[serde(default)]
    pub symbols: BTreeMap<String, ActionSetId>,

    /// Extra sprite replacement types.
    #[serde(default)]
    pub replacement_types: BTreeMap<String, ReplacementType>,

    #[serde(default)]
    pub default_source: Option<String>,

    /// Expected NFO listing (trimmed comparison).
    #[serde(default)]
    pub expect_nfo: Option<String>,

    /// Expected compile error: the error's Display string must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If true, the test expects parsing to fail.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// Expected warnings. If present (even empty), warning count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

impl TestConfig {
    fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            default_source: self.default_source.clone(),
            symbols: self.symbols.clone(),
            replacement_types: self.replacement_types.clone(),
        }
    }
}

/// Split a `.test.nml` file into its TOML config and NML source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;
    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;
    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(TEST_SUFFIX))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Ok(content) => match parse_test_file(&content) {
            Ok((config, source)) => {
                let outcome = match check_test(&config, source) {
                    Some(reason) => TestOutcome::Fail(reason),
                    None => TestOutcome::Pass,
                };
                (config.description, outcome)
            }
            Err(e) => (None, TestOutcome::Fail(format!("frontmatter error: {}", e))),
        },
        Err(e) => (None, TestOutcome::Fail(format!("cannot read file: {}", e))),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Compile `source` under `config` and compare against its expectations.
/// Returns `Some(reason)` on mismatch.
fn check_test(config: &TestConfig, source: &str) -> Option<String> {
    let parse_result = nml::parser::Parser::new(source.to_string(), 0).parse();
    if config.expect_parse_error {
        return match parse_result {
            Err(_) => None,
            Ok(_) => Some("expected parse error, but parsing succeeded".into()),
        };
    }
    let program = match parse_result {
        Ok(p) => p,
        Err(errs) => {
            let msgs: Vec<String> = errs.iter().map(|e| e.message.clone()).collect();
            return Some(format!("unexpected parse error: {}", msgs.join("; ")));
        }
    };

    let result = compiler::compile_program(&program, &config.compiler_config());
    let compilation = match (&config.expect_error, result) {
        (Some(expected), Err(error)) => {
            let message = error.to_string();
            return (!message.contains(expected.as_str())).then(|| {
                format!(
                    "expected error containing \"{}\", got: {}",
                    expected, message
                )
            });
        }
        (Some(expected), Ok(_)) => {
            return Some(format!(
                "expected error containing \"{}\", but compilation succeeded",
                expected
            ));
        }
        (None, Err(error)) => return Some(format!("unexpected compile error: {}", error)),
        (None, Ok(compilation)) => compilation,
    };

    if let Some(expected_nfo) = &config.expect_nfo {
        let actual = to_nfo_string(&compilation.actions);
        if actual.trim() != expected_nfo.trim() {
            return Some(format!(
                "NFO mismatch\n  expected:\n{}\n  actual:\n{}",
                indent(expected_nfo.trim()),
                indent(actual.trim())
            ));
        }
    }

    config
        .expect_warnings
        .as_ref()
        .and_then(|expected| check_warnings(source, &compilation.warnings, expected))
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(
    source: &str,
    actual: &[CompileWarning],
    expected: &[ExpectedWarning],
) -> Option<String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual.iter().map(|w| format!("  - {}", w)).collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (warning, expected)) in actual.iter().zip(expected).enumerate() {
        if !warning.message.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, warning.message
            ));
        }
        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, warning.span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "warning[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }
    None
}

/// Discover `.test.nml` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(TEST_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }
    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }
    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }
}

/// Pick the categories to run. Unknown requested categories are reported.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }
    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let mut found = false;
        for (cat, files) in all {
            if cat == req || cat.starts_with(&prefix) {
                selected.insert(cat.as_str(), files.as_slice());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

/// Run all `.test.nml` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { no_color };

    let groups: Vec<(Option<String>, Vec<PathBuf>)> = if path.is_file() {
        vec![(None, vec![path.to_path_buf()])]
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
            return 1;
        }
        let selected = select_categories(&all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
            .into_iter()
            .map(|(cat, files)| (Some(category_label(cat).to_string()), files.to_vec()))
            .collect()
    };

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();
    for (header, files) in &groups {
        if let Some(header) = header {
            eprintln!();
            eprintln!("{}", style.paint(header, "1"));
        }
        for file in files {
            debug!("running {}", file.display());
            let result = run_single_test(file);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("ok", "32"), passed);
        0
    } else {
        let failed = failures.len();
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("FAILED", "31"),
            passed,
            failed,
            passed + failed
        );
        1
    }
}
