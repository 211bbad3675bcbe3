use std::ops::Range;

use crate::expression::Identifier;
use crate::sprite::SpriteEntry;

/// `template name(p1, p2) { sprites }`: a reusable, parameterised sprite list.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDeclaration {
    pub name: Identifier,
    pub params: Vec<Identifier>,
    pub sprites: Vec<SpriteEntry>,
    pub span: Range<usize>,
}
