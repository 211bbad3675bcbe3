pub mod block;
pub mod expression;
pub mod parser;
pub mod sprite;

use crate::block::Statement;

/// A parsed NML compilation unit.
#[derive(Debug, Clone)]
pub struct Program {
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}
