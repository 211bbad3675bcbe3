use log::trace;

use crate::block::template::TemplateDeclaration;
use crate::block::{ReplaceBlock, ReplaceNewBlock, Statement};
use crate::expression::Identifier;
use crate::parser::cursor::Cursor;
use crate::parser::error::ParseError;
use crate::parser::lexer::TokenKind;
use crate::sprite::{RealSprite, SpriteEntry, TemplateUsage};

/// Parse every top-level statement, recovering after errors so that
/// one run reports as many of them as possible.
pub(crate) fn parse_statements(cursor: &mut Cursor) -> Result<Vec<Statement>, Vec<ParseError>> {
    let mut statements = Vec::new();
    let mut errors = Vec::new();

    while !cursor.at_end() {
        match parse_statement(cursor) {
            Ok(statement) => {
                trace!("parsed statement at {:?}", statement.span());
                statements.push(statement);
            }
            Err(error) => {
                errors.push(error);
                cursor.recover_to_statement();
            }
        }
    }

    if errors.is_empty() {
        Ok(statements)
    } else {
        Err(errors)
    }
}

fn parse_statement(cursor: &mut Cursor) -> Result<Statement, ParseError> {
    let start = cursor.peek_span().start;
    match cursor.peek_kind() {
        Some(TokenKind::Replace) => {
            cursor.advance();
            let params = cursor.parse_argument_list(TokenKind::LParen, TokenKind::RParen)?;
            let sprites = parse_sprite_block(cursor)?;
            Ok(Statement::Replace(ReplaceBlock {
                params,
                sprites,
                span: start..cursor.last_end(),
            }))
        }
        Some(TokenKind::ReplaceNew) => {
            cursor.advance();
            let params = cursor.parse_argument_list(TokenKind::LParen, TokenKind::RParen)?;
            let sprites = parse_sprite_block(cursor)?;
            Ok(Statement::ReplaceNew(ReplaceNewBlock {
                params,
                sprites,
                span: start..cursor.last_end(),
            }))
        }
        Some(TokenKind::Template) => {
            cursor.advance();
            let name = cursor.expect_ident()?;
            let params = parse_template_params(cursor)?;
            let sprites = parse_sprite_block(cursor)?;
            Ok(Statement::Template(TemplateDeclaration {
                name,
                params,
                sprites,
                span: start..cursor.last_end(),
            }))
        }
        _ => {
            let error = cursor
                .unexpected("`replace`, `replacenew` or `template`")
                .with_note("only sprite replacement blocks and templates are supported here");
            Err(error)
        }
    }
}

/// `(a, b, c)`: template parameter names.
fn parse_template_params(cursor: &mut Cursor) -> Result<Vec<Identifier>, ParseError> {
    cursor.expect(TokenKind::LParen)?;
    let mut params = Vec::new();
    loop {
        if cursor.eat(TokenKind::RParen) {
            return Ok(params);
        }
        params.push(cursor.expect_ident()?);
        if !cursor.eat(TokenKind::Comma) {
            cursor.expect(TokenKind::RParen)?;
            return Ok(params);
        }
    }
}

/// `{ entry [,] entry ... }`
fn parse_sprite_block(cursor: &mut Cursor) -> Result<Vec<SpriteEntry>, ParseError> {
    cursor.expect(TokenKind::LBrace)?;
    let mut entries = Vec::new();
    loop {
        match cursor.peek_kind() {
            Some(TokenKind::RBrace) => {
                cursor.advance();
                return Ok(entries);
            }
            Some(TokenKind::Comma) | Some(TokenKind::Semicolon) => {
                cursor.advance();
            }
            Some(TokenKind::LBracket) => {
                let start = cursor.peek_span().start;
                let params =
                    cursor.parse_argument_list(TokenKind::LBracket, TokenKind::RBracket)?;
                entries.push(SpriteEntry::Real(RealSprite {
                    params,
                    span: start..cursor.last_end(),
                }));
            }
            Some(TokenKind::Ident) => {
                let name = cursor.expect_ident()?;
                let start = name.span.start;
                let args = if cursor.peek_kind() == Some(TokenKind::LParen) {
                    cursor.parse_argument_list(TokenKind::LParen, TokenKind::RParen)?
                } else {
                    Vec::new()
                };
                entries.push(SpriteEntry::Template(TemplateUsage {
                    name,
                    args,
                    span: start..cursor.last_end(),
                }));
            }
            _ => return Err(cursor.unexpected("sprite, template usage or `}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::parser::lexer::tokenize;

    fn parse(source: &str) -> Result<Vec<Statement>, Vec<ParseError>> {
        let tokens = tokenize(source, 0).expect("lex failed");
        let mut cursor = Cursor::new(tokens, 0, source.len());
        parse_statements(&mut cursor)
    }

    #[test]
    fn replace_block_with_real_sprites() {
        let statements = parse("replace(100, \"a.png\") { [0, 0, 8, 8, 0, 0] [8, 0, 8, 8, 0, 0] }")
            .expect("parse failed");
        assert_eq!(statements.len(), 1);
        let Statement::Replace(block) = &statements[0] else {
            panic!("expected replace block");
        };
        assert_eq!(block.params.len(), 2);
        assert_eq!(block.sprites.len(), 2);
        assert!(matches!(block.sprites[0], SpriteEntry::Real(ref s) if s.params.len() == 6));
    }

    #[test]
    fn replacenew_with_template_usages() {
        let statements =
            parse("replacenew(TRAIN, \"v.png\", 16) { tmpl(1, 2), tmpl_plain }").expect("parse failed");
        let Statement::ReplaceNew(block) = &statements[0] else {
            panic!("expected replacenew block");
        };
        assert!(matches!(block.params[0], Expression::Identifier(_)));
        match &block.sprites[..] {
            [SpriteEntry::Template(a), SpriteEntry::Template(b)] => {
                assert_eq!(a.name.value, "tmpl");
                assert_eq!(a.args.len(), 2);
                assert_eq!(b.name.value, "tmpl_plain");
                assert!(b.args.is_empty());
            }
            other => panic!("unexpected sprites {:?}", other),
        }
    }

    #[test]
    fn template_declaration() {
        let statements =
            parse("template tmpl(x, y) { [x, y, 8, 8, -4, -4] }").expect("parse failed");
        let Statement::Template(decl) = &statements[0] else {
            panic!("expected template");
        };
        assert_eq!(decl.name.value, "tmpl");
        let names: Vec<&str> = decl.params.iter().map(|p| p.value.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn recovers_and_reports_multiple_errors() {
        let errors = parse("replace(1 { [1] } replacenew { } replace(2) { [1] }").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("expected `)`"));
        assert!(errors[1].message.contains("expected `(`"));
    }

    #[test]
    fn statement_span_covers_block() {
        let source = "  replace(1) { [0,0,1,1,0,0] }  ";
        let statements = parse(source).expect("parse failed");
        assert_eq!(*statements[0].span(), 2..30);
    }
}
