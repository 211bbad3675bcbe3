pub mod template;

use std::ops::Range;

use crate::block::template::TemplateDeclaration;
use crate::expression::Expression;
use crate::sprite::SpriteEntry;

/// A top-level statement of a compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Replace(ReplaceBlock),
    ReplaceNew(ReplaceNewBlock),
    Template(TemplateDeclaration),
}

impl Statement {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Statement::Replace(block) => &block.span,
            Statement::ReplaceNew(block) => &block.span,
            Statement::Template(decl) => &decl.span,
        }
    }
}

/// `replace(start_id[, default_file]) { sprites }`, as written.
/// Parameters are unchecked; the compiler validates them into its own type.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceBlock {
    pub params: Vec<Expression>,
    pub sprites: Vec<SpriteEntry>,
    pub span: Range<usize>,
}

/// `replacenew(type[, default_file[, offset]]) { sprites }`, as written.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceNewBlock {
    pub params: Vec<Expression>,
    pub sprites: Vec<SpriteEntry>,
    pub span: Range<usize>,
}
