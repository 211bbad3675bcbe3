use std::ops::Range;

use crate::expression::{Identifier, MAX_EXPRESSION_DEPTH};
use crate::parser::error::ParseError;
use crate::parser::lexer::{Token, TokenKind};

/// Position in a token stream, shared by the statement and expression parsers.
pub(crate) struct Cursor {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    file_id: usize,
    /// Byte length of the source; spans at end of input point here.
    source_len: usize,
    /// Expressions currently being parsed, innermost last.
    nesting: usize,
}

impl Cursor {
    pub(crate) fn new(tokens: Vec<(Token, Range<usize>)>, file_id: usize, source_len: usize) -> Self {
        Cursor {
            tokens,
            pos: 0,
            file_id,
            source_len,
            nesting: 0,
        }
    }

    pub(crate) fn file_id(&self) -> usize {
        self.file_id
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    pub(crate) fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(Token::kind)
    }

    /// Span of the current token, or an empty span at end of input.
    pub(crate) fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source_len..self.source_len)
    }

    pub(crate) fn advance(&mut self) -> Option<(Token, Range<usize>)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// End offset of the most recently consumed token.
    pub(crate) fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|p| self.tokens.get(p))
            .map_or(0, |(_, span)| span.end)
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Range<usize>, ParseError> {
        match self.peek_kind() {
            Some(k) if k == kind => {
                let span = self.peek_span();
                self.pos += 1;
                Ok(span)
            }
            _ => Err(self.unexpected(kind.to_string())),
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<Identifier, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let ident = Identifier::new(name.clone(), self.peek_span());
                self.pos += 1;
                Ok(ident)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    pub(crate) fn enter_nesting(&mut self) -> Result<(), ParseError> {
        if self.nesting >= MAX_EXPRESSION_DEPTH {
            return Err(self.too_deep(self.peek_span()));
        }
        self.nesting += 1;
        Ok(())
    }

    pub(crate) fn leave_nesting(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    pub(crate) fn too_deep(&self, span: Range<usize>) -> ParseError {
        ParseError::new("expression is nested too deeply", span, self.file_id)
            .with_note(format!("at most {} levels are allowed", MAX_EXPRESSION_DEPTH))
    }

    /// An "expected X, found <current token>" error at the current position.
    pub(crate) fn unexpected(&self, expected: impl AsRef<str>) -> ParseError {
        let found = match self.peek_kind() {
            Some(kind) => kind.to_string(),
            None => "end of input".to_string(),
        };
        ParseError::unexpected(expected, found, self.peek_span(), self.file_id)
    }

    /// Skip tokens until the start of the next top-level statement.
    pub(crate) fn recover_to_statement(&mut self) {
        let mut depth = 0usize;
        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    if depth <= 1 {
                        self.pos += 1;
                        if depth == 1 {
                            return;
                        }
                        continue;
                    }
                    depth -= 1;
                }
                TokenKind::Replace | TokenKind::ReplaceNew | TokenKind::Template if depth == 0 => {
                    return;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }
}
