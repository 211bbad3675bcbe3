mod cursor;
pub mod error;
mod expression;
mod lexer;
mod structural;

pub use error::ParseError;

use crate::Program;
use crate::parser::cursor::Cursor;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source into a complete Program.
    pub fn parse(&self) -> Result<Program, Vec<ParseError>> {
        let tokens = lexer::tokenize(&self.source, self.file_id)?;
        let mut cursor = Cursor::new(tokens, self.file_id, self.source.len());
        let statements = structural::parse_statements(&mut cursor)?;
        Ok(Program {
            statements,
            source_id: self.file_id,
        })
    }
}
