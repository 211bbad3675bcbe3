//! Shared state and dispatch for action stream generation.
//!
//! Each validated block kind implements [`GenerateActions`] with its own
//! encoding strategy (see [`crate::action::replace`] and
//! [`crate::action::replace_new`]). Both go through
//! [`GenerationContext::real_sprites`] to expand and evaluate their sprite
//! lists.

use std::ops::Range;

use log::trace;
use nml::expression::{Expression, SpriteGroupRef};
use nml::sprite::{RealSprite, SpriteEntry};

use crate::action::{ActionRecord, RealSpriteRecord, ReplacementTypeTable};
use crate::block::{SourceFile, ValidatedBlock};
use crate::error::{CompileError, CompileErrorKind, CompileWarning};
use crate::reduce::{reduce, reduce_constant};
use crate::registry::SymbolRegistry;
use crate::template::TemplateTable;

const FIELD_NAMES: [&str; 6] = ["left", "top", "width", "height", "xoffset", "yoffset"];

/// Everything a generation strategy may consult. The registry and tables
/// are borrowed immutably: generation never declares anything.
pub struct GenerationContext<'a> {
    registry: &'a SymbolRegistry,
    templates: &'a TemplateTable,
    replacement_types: &'a ReplacementTypeTable,
    default_source: Option<&'a str>,
    warnings: Vec<CompileWarning>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        registry: &'a SymbolRegistry,
        templates: &'a TemplateTable,
        replacement_types: &'a ReplacementTypeTable,
    ) -> Self {
        GenerationContext {
            registry,
            templates,
            replacement_types,
            default_source: None,
            warnings: Vec::new(),
        }
    }

    /// Image file used by sprites when neither they nor their block name one.
    pub fn with_default_source(mut self, default_source: Option<&'a str>) -> Self {
        self.default_source = default_source;
        self
    }

    pub fn replacement_types(&self) -> &ReplacementTypeTable {
        self.replacement_types
    }

    pub fn warn(&mut self, message: impl Into<String>, span: Range<usize>) {
        self.warnings.push(CompileWarning::new(message, span));
    }

    pub fn take_warnings(&mut self) -> Vec<CompileWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Expand templates and evaluate every sprite of a block, in order.
    pub(crate) fn real_sprites(
        &self,
        entries: &[SpriteEntry],
        source_file: Option<&SourceFile>,
        what: &str,
        span: &Range<usize>,
    ) -> Result<Vec<RealSpriteRecord>, CompileError> {
        let expanded = self.templates.expand(entries)?;
        if expanded.is_empty() {
            return Err(CompileError::new(
                CompileErrorKind::EmptyBlock {
                    what: what.to_string(),
                },
                span.clone(),
            )
            .with_note("every template used in this block expanded to zero sprites"));
        }
        trace!("{} expanded to {} sprite(s)", what, expanded.len());
        expanded
            .iter()
            .map(|sprite| self.real_sprite(sprite, source_file))
            .collect()
    }

    fn real_sprite(
        &self,
        sprite: &RealSprite,
        source_file: Option<&SourceFile>,
    ) -> Result<RealSpriteRecord, CompileError> {
        let params = &sprite.params;
        if !(6..=7).contains(&params.len()) {
            return Err(CompileError::new(
                CompileErrorKind::Arity {
                    what: "real sprite".into(),
                    expected: "6 or 7",
                    found: params.len(),
                },
                sprite.span.clone(),
            ));
        }

        let own_file = match params.get(6) {
            Some(param) => match reduce(param)? {
                Expression::StringLiteral(path, _) => Some(path),
                other => {
                    return Err(CompileError::new(
                        CompileErrorKind::Type {
                            what: "real sprite parameter 7 'file'".into(),
                            expected: "a string literal".into(),
                            found: other.type_tag().to_string(),
                        },
                        param.span().clone(),
                    ));
                }
            },
            None => None,
        };
        let file = own_file
            .or_else(|| source_file.map(|f| f.path.clone()))
            .or_else(|| self.default_source.map(str::to_string))
            .ok_or_else(|| {
                CompileError::new(CompileErrorKind::MissingSource, sprite.span.clone())
                    .with_note("name a file in the sprite or as the block's second parameter")
            })?;

        let mut values = [0i64; 6];
        for (index, value) in values.iter_mut().enumerate() {
            *value = self.field_value(&params[index])?;
        }
        let field = |index: usize, min: i64, max: i64| -> Result<i64, CompileError> {
            let value = values[index];
            if (min..=max).contains(&value) {
                Ok(value)
            } else {
                Err(CompileError::new(
                    CompileErrorKind::Range {
                        what: format!(
                            "real sprite parameter {} '{}'",
                            index + 1,
                            FIELD_NAMES[index]
                        ),
                        min,
                        max,
                        value,
                    },
                    params[index].span().clone(),
                ))
            }
        };

        Ok(RealSpriteRecord {
            file,
            left: field(0, 0, i64::from(u32::MAX))? as u32,
            top: field(1, 0, i64::from(u32::MAX))? as u32,
            width: field(2, 1, i64::from(u16::MAX))? as u16,
            height: field(3, 1, i64::from(u16::MAX))? as u16,
            xoffset: field(4, i64::from(i16::MIN), i64::from(i16::MAX))? as i16,
            yoffset: field(5, i64::from(i16::MIN), i64::from(i16::MAX))? as i16,
        })
    }

    /// A numeric sprite field. Sprite-group references, and bare names that
    /// are not bound to anything else, stand for their action-set id.
    fn field_value(&self, expr: &Expression) -> Result<i64, CompileError> {
        match reduce(expr)? {
            Expression::ConstantNumeric(value, _) => Ok(value),
            Expression::SpriteGroupRef(reference) => {
                Ok(i64::from(self.registry.resolve(&reference)?))
            }
            Expression::Identifier(ident) => {
                let span = ident.span.clone();
                let reference = SpriteGroupRef::new(ident, Vec::new(), span);
                Ok(i64::from(self.registry.resolve(&reference)?))
            }
            other => reduce_constant(&other),
        }
    }
}

/// A block-kind-specific encoding strategy.
pub trait GenerateActions {
    fn generate_actions(
        &self,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<ActionRecord>, CompileError>;
}

impl GenerateActions for ValidatedBlock {
    fn generate_actions(
        &self,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<ActionRecord>, CompileError> {
        match self {
            ValidatedBlock::IdRange(block) => block.generate_actions(ctx),
            ValidatedBlock::Type(block) => block.generate_actions(ctx),
        }
    }
}

/// Generate the ordered action records for a validated block.
pub fn generate_actions(
    block: &ValidatedBlock,
    ctx: &mut GenerationContext<'_>,
) -> Result<Vec<ActionRecord>, CompileError> {
    block.generate_actions(ctx)
}
