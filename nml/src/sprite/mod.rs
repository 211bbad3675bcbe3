use std::ops::Range;

use crate::expression::{Expression, Identifier};

/// One element of a sprite list.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteEntry {
    /// `[left, top, width, height, xoffset, yoffset(, "file")]`
    Real(RealSprite),
    /// `template_name(args)`: expands to the template's sprites.
    Template(TemplateUsage),
}

impl SpriteEntry {
    pub fn span(&self) -> &Range<usize> {
        match self {
            SpriteEntry::Real(sprite) => &sprite.span,
            SpriteEntry::Template(usage) => &usage.span,
        }
    }
}

/// A literal real sprite. Parameters are kept unevaluated until generation.
#[derive(Debug, Clone, PartialEq)]
pub struct RealSprite {
    pub params: Vec<Expression>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateUsage {
    pub name: Identifier,
    pub args: Vec<Expression>,
    pub span: Range<usize>,
}
