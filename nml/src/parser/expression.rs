use crate::expression::{
    BinaryOperator, Expression, Identifier, MAX_EXPRESSION_DEPTH, SpriteGroupRef, UnaryOperator,
};
use crate::parser::cursor::Cursor;
use crate::parser::error::ParseError;
use crate::parser::lexer::{Token, TokenKind};

// Binding powers (precedence). Higher = tighter binding.
// All binary operators are left-associative: right = left + 1.
const BP_OR: u8 = 2; // |
const BP_XOR: u8 = 4; // ^
const BP_AND: u8 = 6; // &
const BP_SHIFT: u8 = 8; // << >>
const BP_ADDITIVE: u8 = 10; // + -
const BP_MULTIPLICATIVE: u8 = 12; // * / %
const BP_UNARY: u8 = 14; // - ~

/// Infix binding powers: returns (left_bp, right_bp, operator) or None if not infix.
fn infix_bp(kind: TokenKind) -> Option<(u8, u8, BinaryOperator)> {
    let (bp, op) = match kind {
        TokenKind::Pipe => (BP_OR, BinaryOperator::BitwiseOr),
        TokenKind::Caret => (BP_XOR, BinaryOperator::BitwiseXor),
        TokenKind::Amp => (BP_AND, BinaryOperator::BitwiseAnd),
        TokenKind::ShiftLeft => (BP_SHIFT, BinaryOperator::ShiftLeft),
        TokenKind::ShiftRight => (BP_SHIFT, BinaryOperator::ShiftRight),
        TokenKind::Plus => (BP_ADDITIVE, BinaryOperator::Addition),
        TokenKind::Minus => (BP_ADDITIVE, BinaryOperator::Subtraction),
        TokenKind::Star => (BP_MULTIPLICATIVE, BinaryOperator::Multiplication),
        TokenKind::Slash => (BP_MULTIPLICATIVE, BinaryOperator::Division),
        TokenKind::Percent => (BP_MULTIPLICATIVE, BinaryOperator::Modulo),
        _ => return None,
    };
    Some((bp, bp + 1, op))
}

impl Cursor {
    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    pub(crate) fn parse_expr(&mut self, min_bp: u8) -> Result<Expression, ParseError> {
        self.enter_nesting()?;
        let result = self.parse_expr_bounded(min_bp);
        self.leave_nesting();
        result
    }

    /// Operator chains are built in a loop, so their tree depth is tracked
    /// here rather than by the nesting counter.
    fn parse_expr_bounded(&mut self, min_bp: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_prefix()?;
        let mut depth = left.depth();
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(self.too_deep(left.span().clone()));
        }

        while let Some((l_bp, r_bp, operator)) = self.peek_kind().and_then(infix_bp) {
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let right = self.parse_expr(r_bp)?;
            let span = left.span().start..right.span().end;
            depth = depth.max(right.depth()) + 1;
            if depth > MAX_EXPRESSION_DEPTH {
                return Err(self.too_deep(span));
            }
            left = Expression::BinaryOperation {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        let Some((token, span)) = self.advance() else {
            return Err(self.unexpected("expression"));
        };

        match token {
            Token::Number(n) => Ok(Expression::ConstantNumeric(n, span)),
            Token::StringLit(s) => Ok(Expression::StringLiteral(s, span)),

            // `name(args)` is a sprite-group reference; a bare name stays an identifier
            Token::Ident(name) => {
                let name = Identifier::new(name, span.clone());
                if self.peek_kind() == Some(TokenKind::LParen) {
                    let params = self.parse_argument_list(TokenKind::LParen, TokenKind::RParen)?;
                    let full = span.start..self.last_end();
                    Ok(Expression::SpriteGroupRef(SpriteGroupRef::new(name, params, full)))
                } else {
                    Ok(Expression::Identifier(name))
                }
            }

            Token::Minus | Token::Tilde => {
                let operator = if token == Token::Minus {
                    UnaryOperator::Negation
                } else {
                    UnaryOperator::BitwiseNot
                };
                let operand = self.parse_expr(BP_UNARY)?;
                let full = span.start..operand.span().end;
                Ok(Expression::UnaryOperation {
                    operator,
                    operand: Box::new(operand),
                    span: full,
                })
            }

            Token::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }

            other => Err(ParseError::unexpected(
                "expression",
                other.kind().to_string(),
                span,
                self.file_id(),
            )),
        }
    }

    /// Parse `open expr (, expr)* [,] close`. The list may be empty.
    pub(crate) fn parse_argument_list(
        &mut self,
        open: TokenKind,
        close: TokenKind,
    ) -> Result<Vec<Expression>, ParseError> {
        self.expect(open)?;
        let mut args = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(args);
            }
            args.push(self.parse_expr(0)?);
            if !self.eat(TokenKind::Comma) {
                self.expect(close)?;
                return Ok(args);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::expression::{BinaryOperator, Expression, ReferenceKind};
    use crate::parser::cursor::Cursor;
    use crate::parser::lexer::tokenize;

    fn parse(source: &str) -> Expression {
        let tokens = tokenize(source, 0).expect("lex failed");
        let mut cursor = Cursor::new(tokens, 0, source.len());
        let expr = cursor.parse_expr(0).expect("parse failed");
        assert!(cursor.at_end(), "trailing tokens in {:?}", source);
        expr
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(parse("1 + 2 * 3").to_string(), "(1 + (2 * 3))");
        assert_eq!(parse("10 - 4 - 3").to_string(), "((10 - 4) - 3)");
        assert_eq!(parse("1 << 2 + 1").to_string(), "(1 << (2 + 1))");
        assert_eq!(parse("(1 | 2) & 3").to_string(), "((1 | 2) & 3)");
    }

    #[test]
    fn spans_cover_operands() {
        let expr = parse("12 + 345");
        assert_eq!(*expr.span(), 0..8);
        match expr {
            Expression::BinaryOperation { operator, .. } => {
                assert_eq!(operator, BinaryOperator::Addition)
            }
            other => panic!("expected binary operation, got {:?}", other),
        }
    }

    #[test]
    fn call_syntax_builds_sprite_group_reference() {
        match parse("CB_FAILED()") {
            Expression::SpriteGroupRef(reference) => {
                assert_eq!(reference.kind(), ReferenceKind::CallbackFailed);
                assert_eq!(*reference.span(), 0..11);
            }
            other => panic!("expected reference, got {:?}", other),
        }
        match parse("layout_a(1, 2)") {
            Expression::SpriteGroupRef(reference) => {
                assert_eq!(reference.params().len(), 2);
                assert_eq!(reference.kind(), ReferenceKind::Named);
            }
            other => panic!("expected reference, got {:?}", other),
        }
    }

    #[test]
    fn bare_name_is_identifier() {
        assert!(matches!(parse("TRAIN"), Expression::Identifier(_)));
    }

    fn parse_err(source: &str) -> String {
        let tokens = tokenize(source, 0).expect("lex failed");
        let mut cursor = Cursor::new(tokens, 0, source.len());
        cursor.parse_expr(0).expect_err("parse succeeded").message
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let source = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(parse_err(&source), "expression is nested too deeply");

        let ok = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&ok).to_string(), "1");
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let source = vec!["1"; 300_000].join(" + ");
        assert_eq!(parse_err(&source), "expression is nested too deeply");

        let ok = vec!["1"; 200].join(" + ");
        assert_eq!(parse(&ok).depth(), 200);
    }

    #[test]
    fn nested_unary_operators_are_rejected() {
        let source = format!("{}1", "-".repeat(10_000));
        assert_eq!(parse_err(&source), "expression is nested too deeply");
    }
}
