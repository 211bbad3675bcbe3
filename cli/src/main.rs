mod test_runner;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use log::{LevelFilter, debug};

use compiler::CompilerConfig;

const SUBCOMMANDS: &[&str] = &["compile", "test", "help"];

#[derive(Parser)]
#[command(name = "nmlc", version, about = "Sprite replacement compiler")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an NML source file to an NFO listing
    Compile(CompileArgs),

    /// Run .test.nml test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CompileArgs {
    /// NML source file to compile
    file: String,

    /// Compiler configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the NFO listing here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compile but write nothing (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump parsed AST
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.nml file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short = 'C', long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `nmlc file.nml` is shorthand for `nmlc compile file.nml`.
    let mut args: Vec<String> = std::env::args().collect();
    let first_pos = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|p| p + 1);
    if let Some(pos) = first_pos
        && !SUBCOMMANDS.contains(&args[pos].as_str())
    {
        args.insert(pos, "compile".to_string());
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    match cli.command {
        Command::Compile(compile_args) => do_compile(compile_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn do_compile(args: CompileArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let config = match &args.config {
        Some(path) => match CompilerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
        None => CompilerConfig::default(),
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());
    let writer = StandardStream::stderr(color_choice);
    let term_config = term::Config::default();

    let parser = nml::parser::Parser::new(source, file_id);
    let program = match parser.parse() {
        Ok(p) => p,
        Err(errors) => {
            let diagnostics: Vec<_> = errors.iter().map(|e| e.to_diagnostic()).collect();
            emit_diagnostics(&writer, &term_config, &files, &diagnostics);
            process::exit(1);
        }
    };
    debug!("parsed {} statement(s) from {}", program.statements.len(), args.file);

    if args.ast {
        println!("{:#?}", program);
        return;
    }

    let compilation = match compiler::compile_program(&program, &config) {
        Ok(c) => c,
        Err(error) => {
            emit_diagnostics(&writer, &term_config, &files, &[error.to_diagnostic()]);
            process::exit(1);
        }
    };
    let warnings: Vec<_> = compilation.warnings.iter().map(|w| w.to_diagnostic()).collect();
    emit_diagnostics(&writer, &term_config, &files, &warnings);

    if args.check {
        eprintln!("ok: {} compiled successfully", args.file);
        return;
    }

    let result = match &args.output {
        Some(path) => std::fs::File::create(path).and_then(|mut file| {
            compiler::nfo::write_nfo(&compilation.actions, &mut file)?;
            file.flush()
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            compiler::nfo::write_nfo(&compilation.actions, &mut stdout)
        }
    };
    if let Err(e) = result {
        eprintln!("error: cannot write output: {}", e);
        process::exit(1);
    }
}

fn emit_diagnostics(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostics: &[Diagnostic<usize>],
) {
    for diagnostic in diagnostics {
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, diagnostic);
    }
}
