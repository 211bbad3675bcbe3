//! Parameter validation for replace blocks.
//!
//! Consumes a raw block from the parser and produces its validated
//! counterpart from [`crate::block`], or the first error found.

use std::ops::Range;

use log::trace;
use nml::block::{ReplaceBlock, ReplaceNewBlock, Statement};
use nml::expression::Expression;
use nml::sprite::SpriteEntry;

use crate::block::{IdRangeReplacement, SourceFile, TypeReplacement, ValidatedBlock};
use crate::error::{CompileError, CompileErrorKind};
use crate::reduce::{reduce, reduce_constant};

const MAX_OFFSET: i64 = 0xFFFF;

/// Turn a raw block into its validated form.
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, CompileError>;
}

impl Validate for ReplaceBlock {
    type Output = IdRangeReplacement;

    fn validate(self) -> Result<IdRangeReplacement, CompileError> {
        validate_replace(self)
    }
}

impl Validate for ReplaceNewBlock {
    type Output = TypeReplacement;

    fn validate(self) -> Result<TypeReplacement, CompileError> {
        validate_replace_new(self)
    }
}

/// `replace(start_id[, file])`
pub fn validate_replace(block: ReplaceBlock) -> Result<IdRangeReplacement, CompileError> {
    let ReplaceBlock {
        params,
        sprites,
        span,
    } = block;
    check_arity("replace-block", "1 or 2", 1..=2, params.len(), &span)?;

    // The optional file parameter is checked before the start id, so a
    // malformed file is reported even when both parameters are wrong.
    let source_file = params
        .get(1)
        .map(|param| string_literal(param, "replace-block parameter 2 'file'"))
        .transpose()?;
    let start_id = reduce_constant(&params[0])?;
    check_not_empty("replace-block", &sprites, &span)?;

    trace!("validated replace-block starting at {}", start_id);
    Ok(IdRangeReplacement::new(start_id, source_file, sprites, span))
}

/// `replacenew(type[, file[, offset]])`
pub fn validate_replace_new(block: ReplaceNewBlock) -> Result<TypeReplacement, CompileError> {
    let ReplaceNewBlock {
        params,
        sprites,
        span,
    } = block;
    check_arity("replacenew-block", "1 to 3", 1..=3, params.len(), &span)?;

    let target_type = match &params[0] {
        Expression::Identifier(ident) => ident.clone(),
        other => {
            return Err(CompileError::new(
                CompileErrorKind::Type {
                    what: "replacenew parameter 'type'".into(),
                    expected: "an identifier of a sprite replacement type".into(),
                    found: other.type_tag().to_string(),
                },
                other.span().clone(),
            ));
        }
    };

    let source_file = params
        .get(1)
        .map(|param| string_literal(param, "replacenew-block parameter 2 'file'"))
        .transpose()?;

    let offset = match params.get(2) {
        Some(param) => {
            let value = reduce_constant(param)?;
            if !(0..=MAX_OFFSET).contains(&value) {
                return Err(CompileError::new(
                    CompileErrorKind::Range {
                        what: "replacenew-block parameter 3 'offset'".into(),
                        min: 0,
                        max: MAX_OFFSET,
                        value,
                    },
                    param.span().clone(),
                ));
            }
            value as u16
        }
        None => 0,
    };
    check_not_empty("replacenew-block", &sprites, &span)?;

    trace!(
        "validated replacenew-block for {} at offset {}",
        target_type.value, offset
    );
    Ok(TypeReplacement::new(
        target_type,
        source_file,
        offset,
        sprites,
        span,
    ))
}

/// Validate a replace or replacenew statement. Templates are not blocks
/// and yield `None`.
pub fn validate_statement(statement: Statement) -> Option<Result<ValidatedBlock, CompileError>> {
    match statement {
        Statement::Replace(block) => Some(block.validate().map(ValidatedBlock::from)),
        Statement::ReplaceNew(block) => Some(block.validate().map(ValidatedBlock::from)),
        Statement::Template(_) => None,
    }
}

fn check_arity(
    what: &str,
    expected: &'static str,
    allowed: std::ops::RangeInclusive<usize>,
    found: usize,
    span: &Range<usize>,
) -> Result<(), CompileError> {
    if allowed.contains(&found) {
        return Ok(());
    }
    Err(CompileError::new(
        CompileErrorKind::Arity {
            what: what.to_string(),
            expected,
            found,
        },
        span.clone(),
    ))
}

fn check_not_empty(
    what: &str,
    sprites: &[SpriteEntry],
    span: &Range<usize>,
) -> Result<(), CompileError> {
    if sprites.is_empty() {
        return Err(CompileError::new(
            CompileErrorKind::EmptyBlock {
                what: what.to_string(),
            },
            span.clone(),
        ));
    }
    Ok(())
}

fn string_literal(param: &Expression, what: &str) -> Result<SourceFile, CompileError> {
    match reduce(param)? {
        Expression::StringLiteral(path, span) => Ok(SourceFile { path, span }),
        other => Err(CompileError::new(
            CompileErrorKind::Type {
                what: what.to_string(),
                expected: "a string literal".into(),
                found: other.type_tag().to_string(),
            },
            param.span().clone(),
        )),
    }
}
