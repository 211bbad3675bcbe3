use std::io::Write;

use compiler::action::{ActionRecord, BlockRule, ReplaceNewAction, ReplacementType};
use compiler::nfo::to_nfo_string;
use compiler::{CompileError, CompileErrorKind, Compilation, CompilerConfig, SymbolRegistry};
use pretty_assertions::assert_eq;

fn parse(source: &str) -> nml::Program {
    nml::parser::Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed")
}

fn compile_with(source: &str, config: &CompilerConfig) -> Result<Compilation, CompileError> {
    compiler::compile_program(&parse(source), config)
}

fn compile(source: &str) -> Compilation {
    compile_with(source, &CompilerConfig::default()).expect("compilation failed")
}

fn compile_err(source: &str) -> CompileError {
    compile_with(source, &CompilerConfig::default()).expect_err("compilation succeeded")
}

fn nfo(source: &str) -> String {
    to_nfo_string(&compile(source).actions)
}

#[test]
fn replace_reserves_consecutive_slots_with_own_files() {
    let compilation = compile(
        r#"
replace(100) {
    [0, 0, 8, 8, 0, 0, "a.png"]
    [8, 0, 8, 8, 0, 0, "b.png"]
}
"#,
    );
    let ActionRecord::Replace(action) = &compilation.actions[0] else {
        panic!("expected a replace action, got {:?}", compilation.actions[0]);
    };
    assert_eq!(action.slots().collect::<Vec<_>>(), vec![100, 101]);
    let files: Vec<&str> = compilation.actions[1..]
        .iter()
        .map(|a| match a {
            ActionRecord::RealSprite(sprite) => sprite.file.as_str(),
            other => panic!("expected a real sprite, got {other:?}"),
        })
        .collect();
    assert_eq!(files, vec!["a.png", "b.png"]);
    assert!(compilation.warnings.is_empty());
}

#[test]
fn replace_listing() {
    assert_eq!(
        nfo(r#"replace(100) { [0, 0, 8, 8, 0, 0, "a.png"] [8, 0, 8, 8, 0, 0, "b.png"] }"#),
        "    1 * 5\t 0A 01 02 64 00\n    2 a.png 0 0 8 8 0 0\n    3 b.png 8 0 8 8 0 0\n"
    );
}

#[test]
fn block_file_applies_to_sprites_without_one() {
    assert_eq!(
        nfo(r#"replace(0x1F, "base.png") { [0, 0, 4, 4, -2, -2] [0, 4, 4, 4, 0, 0, "x.png"] }"#),
        "    1 * 5\t 0A 01 02 1F 00\n    2 base.png 0 0 4 4 -2 -2\n    3 x.png 0 4 4 4 0 0\n"
    );
}

#[test]
fn replace_with_a_string_start_id_reports_the_second_parameter() {
    let source = r#"replace("start", 123) { [0, 0, 8, 8, 0, 0, "a.png"] }"#;
    let err = compile_err(source);
    assert!(matches!(err.kind, CompileErrorKind::Type { .. }), "{err}");
    assert_eq!(&source[err.span.clone().unwrap()], "123");
}

#[test]
fn replacenew_with_configured_type_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[replacement_types.TRAIN]\ncode = 0x19\nsprites = 64\nblock = \"offset\""
    )
    .unwrap();
    let config = CompilerConfig::load(file.path()).unwrap();

    let compilation = compile_with(
        r#"replacenew(TRAIN, "vehicles.png", 16) { [0, 0, 32, 16, -16, -8] }"#,
        &config,
    )
    .unwrap();
    assert_eq!(
        compilation.actions[0],
        ActionRecord::ReplaceNew(ReplaceNewAction {
            type_name: "TRAIN".into(),
            type_code: 0x19,
            num_sprites: 1,
            offset: 16,
            encode_offset: true,
        })
    );
    let ActionRecord::ReplaceNew(action) = &compilation.actions[0] else {
        unreachable!();
    };
    assert_eq!(action.slots().collect::<Vec<_>>(), vec![16]);
    assert_eq!(
        to_nfo_string(&compilation.actions),
        "    1 * 4\t 05 99 01 10\n    2 vehicles.png 0 0 32 16 -16 -8\n"
    );
}

#[test]
fn unknown_replacement_type() {
    let source = r#"replacenew(TRAIN, "vehicles.png") { [0, 0, 8, 8, 0, 0] }"#;
    let err = compile_err(source);
    assert_eq!(
        err.kind,
        CompileErrorKind::UnknownReplacementType {
            name: "TRAIN".into()
        }
    );
    assert_eq!(&source[err.span.clone().unwrap()], "TRAIN");
}

#[test]
fn fixed_type_with_extra_sprites_warns() {
    let sprites = "[0, 0, 8, 8, 0, 0] ".repeat(17);
    let compilation = compile(&format!(r#"replacenew(COAST, "coast.png") {{ {sprites} }}"#));
    assert_eq!(compilation.warnings.len(), 1);
    assert!(
        compilation.warnings[0].message.contains("too many sprites"),
        "{}",
        compilation.warnings[0]
    );
    assert_eq!(compilation.actions.len(), 18);
}

#[test]
fn fixed_type_with_too_few_sprites_is_an_error() {
    let err = compile_err(r#"replacenew(COAST, "coast.png") { [0, 0, 8, 8, 0, 0] }"#);
    assert_eq!(
        err.kind,
        CompileErrorKind::SpriteCount {
            name: "COAST".into(),
            expected: 16,
            found: 1,
        }
    );
}

#[test]
fn cb_failed_in_a_sprite_field_is_zero() {
    assert_eq!(
        nfo(r#"replace(5, "a.png") { [CB_FAILED, CB_FAILED(), 8, 8, 0, 0] }"#),
        "    1 * 5\t 0A 01 01 05 00\n    2 a.png 0 0 8 8 0 0\n"
    );
}

#[test]
fn configured_symbols_resolve_in_sprite_fields() {
    let config = CompilerConfig::from_toml_str("[symbols]\nground = 7").unwrap();
    let compilation = compile_with(
        r#"replace(5, "a.png") { [ground(), ground, 8, 8, 0, 0] }"#,
        &config,
    )
    .unwrap();
    assert_eq!(
        to_nfo_string(&compilation.actions),
        "    1 * 5\t 0A 01 01 05 00\n    2 a.png 7 7 8 8 0 0\n"
    );
}

#[test]
fn unresolved_reference_points_at_the_reference() {
    let source = r#"replace(5, "a.png") { [missing(1), 0, 8, 8, 0, 0] }"#;
    let err = compile_err(source);
    assert_eq!(
        err.kind,
        CompileErrorKind::UnresolvedReference {
            name: "missing".into()
        }
    );
    assert_eq!(&source[err.span.clone().unwrap()], "missing(1)");
}

#[test]
fn preexisting_registry_is_consulted() {
    let mut registry = SymbolRegistry::new();
    let id = registry
        .register(&nml::expression::Identifier::new("shared", 0..0))
        .unwrap();
    let compilation = compiler::compile_program_with_registry(
        &parse(r#"replace(5, "a.png") { [shared, 0, 8, 8, 0, 0] }"#),
        &CompilerConfig::default(),
        &mut registry,
    )
    .unwrap();
    let ActionRecord::RealSprite(sprite) = &compilation.actions[1] else {
        panic!("expected a real sprite");
    };
    assert_eq!(sprite.left, u32::from(id));
}

#[test]
fn templates_expand_before_counting() {
    assert_eq!(
        nfo(
            r#"
replace(10, "base.png") { pair(16) }

template pair(x) {
    [x, 0, 8, 8, 0, 0]
    [x + 8, 0, 8, 8, 0, 0]
}
"#
        ),
        "    1 * 5\t 0A 01 02 0A 00\n    2 base.png 16 0 8 8 0 0\n    3 base.png 24 0 8 8 0 0\n"
    );
}

#[test]
fn duplicate_template_is_an_error() {
    let err = compile_err(
        "template t() { [0, 0, 1, 1, 0, 0] }\ntemplate t() { [0, 0, 1, 1, 0, 0] }",
    );
    assert_eq!(err.kind, CompileErrorKind::DuplicateName { name: "t".into() });
}

#[test]
fn missing_source_uses_configured_default() {
    let source = "replace(1) { [0, 0, 8, 8, 0, 0] }";
    assert_eq!(compile_err(source).kind, CompileErrorKind::MissingSource);

    let config = CompilerConfig::from_toml_str("default_source = \"fallback.png\"").unwrap();
    let compilation = compile_with(source, &config).unwrap();
    assert_eq!(
        to_nfo_string(&compilation.actions),
        "    1 * 5\t 0A 01 01 01 00\n    2 fallback.png 0 0 8 8 0 0\n"
    );
}

#[test]
fn large_replace_is_split_into_sets() {
    let sprites = "[0, 0, 1, 1, 0, 0] ".repeat(300);
    let compilation = compile(&format!(r#"replace(1000, "a.png") {{ {sprites} }}"#));
    let ActionRecord::Replace(action) = &compilation.actions[0] else {
        panic!("expected a replace action");
    };
    assert_eq!(action.sets.len(), 2);
    assert_eq!(action.sets[0].num_sprites, 255);
    assert_eq!(action.sets[1].first_sprite, 1255);
    assert_eq!(action.num_sprites(), 300);
    assert_eq!(compilation.actions.len(), 301);
}

#[test]
fn errors_carry_the_program_file_id() {
    let program = nml::parser::Parser::new("replace() { }".to_string(), 3)
        .parse()
        .unwrap();
    let err = compiler::compile_program(&program, &CompilerConfig::default()).unwrap_err();
    assert_eq!(err.file_id, 3);
}

#[test]
fn configured_type_overrides_builtin() {
    let mut config = CompilerConfig::default();
    config.replacement_types.insert(
        "COAST".into(),
        ReplacementType {
            code: 0x0D,
            sprites: 1,
            block: BlockRule::Fixed,
        },
    );
    let compilation =
        compile_with(r#"replacenew(COAST, "c.png") { [0, 0, 8, 8, 0, 0] }"#, &config).unwrap();
    assert_eq!(
        to_nfo_string(&compilation.actions),
        "    1 * 3\t 05 0D 01\n    2 c.png 0 0 8 8 0 0\n"
    );
}

fn range_err(source: &str) -> (String, i64, i64, i64) {
    match compile_err(source).kind {
        CompileErrorKind::Range {
            what,
            min,
            max,
            value,
        } => (what, min, max, value),
        other => panic!("expected a range error, got {other:?}"),
    }
}

#[test]
fn replace_past_the_last_sprite_number() {
    assert_eq!(
        range_err(r#"replace(65535, "a.png") { [0, 0, 8, 8, 0, 0] [8, 0, 8, 8, 0, 0] }"#),
        ("replace-block sprite number".to_string(), 0, 0xFFFF, 0x10000)
    );
    assert_eq!(
        range_err(r#"replace(-1, "a.png") { [0, 0, 8, 8, 0, 0] }"#),
        ("replace-block sprite number".to_string(), 0, 0xFFFF, -1)
    );
    // The very last slot is still usable.
    assert_eq!(
        nfo(r#"replace(65535, "a.png") { [0, 0, 8, 8, 0, 0] }"#),
        "    1 * 5\t 0A 01 01 FF FF\n    2 a.png 0 0 8 8 0 0\n"
    );
}

#[test]
fn offset_on_fixed_and_any_types_is_out_of_range() {
    let sprites = "[0, 0, 8, 8, 0, 0] ".repeat(16);
    let (what, min, max, value) =
        range_err(&format!(r#"replacenew(COAST, "c.png", 1) {{ {sprites} }}"#));
    assert_eq!(
        what,
        "replacenew parameter 'offset' for sprite replacement type 'COAST'"
    );
    assert_eq!((min, max, value), (0, 0, 1));

    let (what, _, _, value) =
        range_err(r#"replacenew(NEW_SIGNALS, "s.png", 2) { [0, 0, 8, 8, 0, 0] }"#);
    assert_eq!(
        what,
        "replacenew parameter 'offset' for sprite replacement type 'NEW_SIGNALS'"
    );
    assert_eq!(value, 2);
}

#[test]
fn offset_type_with_a_full_block_omits_the_offset() {
    let sprites = "[0, 0, 8, 8, 0, 0] ".repeat(6);
    let compilation = compile(&format!(r#"replacenew(ONE_WAY_ROAD, "r.png") {{ {sprites} }}"#));
    let ActionRecord::ReplaceNew(action) = &compilation.actions[0] else {
        panic!("expected a replacenew action");
    };
    assert!(!action.encode_offset);
    assert_eq!(action.to_bytes(), vec![0x05, 0x09, 0x06]);
    assert!(compilation.warnings.is_empty());
}

#[test]
fn block_of_only_empty_templates_is_an_error() {
    let err = compile_err("template e() { }\nreplace(1, \"a.png\") { e() }");
    assert_eq!(
        err.kind,
        CompileErrorKind::EmptyBlock {
            what: "replace-block".into()
        }
    );
}

#[test]
fn real_sprite_fields_are_range_checked() {
    assert_eq!(
        range_err(r#"replace(1, "a.png") { [0, 0, 0, 8, 0, 0] }"#),
        ("real sprite parameter 3 'width'".to_string(), 1, 0xFFFF, 0)
    );
    assert_eq!(
        range_err(r#"replace(1, "a.png") { [0, 0, 8, 8, 40000, 0] }"#),
        (
            "real sprite parameter 5 'xoffset'".to_string(),
            i64::from(i16::MIN),
            i64::from(i16::MAX),
            40000
        )
    );
}

#[test]
fn template_fan_out_is_stopped_at_the_sprite_limit() {
    let mut source = String::from("template t0() { [0, 0, 1, 1, 0, 0] }\n");
    for level in 1..=30 {
        source.push_str(&format!(
            "template t{level}() {{ t{prev}() t{prev}() }}\n",
            prev = level - 1
        ));
    }
    source.push_str("replace(0, \"a.png\") { t30() }\n");

    let err = compile_err(&source);
    assert_eq!(
        err.kind,
        CompileErrorKind::Range {
            what: "number of sprites after template expansion".into(),
            min: 0,
            max: 0x1_0000,
            value: 0x1_0001,
        }
    );
    assert_eq!(&source[err.span.clone().unwrap()], "t30()");
}

#[test]
fn deeply_nested_expressions_are_parse_errors() {
    let deep = format!(
        "replace({}1{}, \"a.png\") {{ [0, 0, 8, 8, 0, 0] }}",
        "(".repeat(200_000),
        ")".repeat(200_000)
    );
    let errors = nml::parser::Parser::new(deep, 0).parse().unwrap_err();
    assert_eq!(errors[0].message, "expression is nested too deeply");

    let long = format!(
        "replace(1, \"a.png\") {{ [{}, 0, 8, 8, 0, 0] }}",
        vec!["1"; 300_000].join(" + ")
    );
    let errors = nml::parser::Parser::new(long, 0).parse().unwrap_err();
    assert_eq!(errors[0].message, "expression is nested too deeply");
}

#[test]
fn configured_symbol_clash_has_no_source_label() {
    let mut registry = SymbolRegistry::new();
    registry
        .register(&nml::expression::Identifier::new("shared", 0..0))
        .unwrap();
    let config = CompilerConfig::from_toml_str("[symbols]\nshared = 9").unwrap();
    let err = compiler::compile_program_with_registry(
        &parse(r#"replace(5, "a.png") { [0, 0, 8, 8, 0, 0] }"#),
        &config,
        &mut registry,
    )
    .unwrap_err();
    assert_eq!(
        err.kind,
        CompileErrorKind::DuplicateName {
            name: "shared".into()
        }
    );
    assert_eq!(err.span, None);
    assert!(err.to_diagnostic().labels.is_empty());
}
