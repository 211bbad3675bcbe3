use log::debug;
use nml::Program;
use nml::block::Statement;
use nml::expression::Identifier;

use crate::action::ActionRecord;
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileWarning};
use crate::generator::{GenerateActions, GenerationContext};
use crate::registry::SymbolRegistry;
use crate::template::TemplateTable;
use crate::validate::validate_statement;

/// The result of compiling one program.
#[derive(Debug)]
pub struct Compilation {
    pub actions: Vec<ActionRecord>,
    pub warnings: Vec<CompileWarning>,
}

/// Compile a program with a fresh symbol registry.
pub fn compile_program(
    program: &Program,
    config: &CompilerConfig,
) -> Result<Compilation, CompileError> {
    let mut registry = SymbolRegistry::new();
    compile_program_with_registry(program, config, &mut registry)
}

/// Compile a program against `registry`, which may already hold action sets
/// declared by other compilation units.
///
/// All declarations are processed before any block is generated, so a block
/// may refer to names declared after it.
pub fn compile_program_with_registry(
    program: &Program,
    config: &CompilerConfig,
    registry: &mut SymbolRegistry,
) -> Result<Compilation, CompileError> {
    let file_id = program.source_id;

    // Declaration phase
    for (name, id) in &config.symbols {
        registry
            .register_with_id(&Identifier::new(name.clone(), 0..0), *id)
            .map_err(|e| {
                CompileError::unlocated(e.kind)
                    .with_note(format!("'{}' is declared in the compiler configuration", name))
            })?;
    }
    let mut templates = TemplateTable::new();
    for statement in &program.statements {
        if let Statement::Template(declaration) = statement {
            templates
                .declare(declaration.clone())
                .map_err(|e| e.in_file(file_id))?;
        }
    }
    debug!(
        "declaration phase done: {} action set(s), {} statement(s)",
        registry.len(),
        program.statements.len()
    );

    // Generation phase
    let replacement_types = config.replacement_type_table();
    let mut ctx = GenerationContext::new(registry, &templates, &replacement_types)
        .with_default_source(config.default_source.as_deref());
    let mut actions = Vec::new();
    for statement in &program.statements {
        let Some(block) = validate_statement(statement.clone()) else {
            continue;
        };
        let block = block.map_err(|e| e.in_file(file_id))?;
        let generated = block
            .generate_actions(&mut ctx)
            .map_err(|e| e.in_file(file_id))?;
        actions.extend(generated);
    }

    let warnings = ctx
        .take_warnings()
        .into_iter()
        .map(|mut w| {
            w.file_id = file_id;
            w
        })
        .collect();
    debug!("generated {} action record(s)", actions.len());
    Ok(Compilation { actions, warnings })
}
