use std::fmt;
use std::ops::Range;

use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    // Literals
    Number(i64),
    StringLit(String),
    Ident(String),

    // Keywords
    Replace,
    ReplaceNew,
    Template,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    ShiftLeft,
    ShiftRight,

    // Punctuation
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
}

/// Payload-free token discriminant, for matching and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Number,
    StringLit,
    Ident,
    Replace,
    ReplaceNew,
    Template,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    ShiftLeft,
    ShiftRight,
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
}

impl Token {
    pub(crate) fn kind(&self) -> TokenKind {
        match self {
            Token::Number(_) => TokenKind::Number,
            Token::StringLit(_) => TokenKind::StringLit,
            Token::Ident(_) => TokenKind::Ident,
            Token::Replace => TokenKind::Replace,
            Token::ReplaceNew => TokenKind::ReplaceNew,
            Token::Template => TokenKind::Template,
            Token::Plus => TokenKind::Plus,
            Token::Minus => TokenKind::Minus,
            Token::Star => TokenKind::Star,
            Token::Slash => TokenKind::Slash,
            Token::Percent => TokenKind::Percent,
            Token::Amp => TokenKind::Amp,
            Token::Pipe => TokenKind::Pipe,
            Token::Caret => TokenKind::Caret,
            Token::Tilde => TokenKind::Tilde,
            Token::ShiftLeft => TokenKind::ShiftLeft,
            Token::ShiftRight => TokenKind::ShiftRight,
            Token::Comma => TokenKind::Comma,
            Token::Semicolon => TokenKind::Semicolon,
            Token::LParen => TokenKind::LParen,
            Token::RParen => TokenKind::RParen,
            Token::LBrace => TokenKind::LBrace,
            Token::RBrace => TokenKind::RBrace,
            Token::LBracket => TokenKind::LBracket,
            Token::RBracket => TokenKind::RBracket,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Number => "number",
            TokenKind::StringLit => "string literal",
            TokenKind::Ident => "identifier",
            TokenKind::Replace => "`replace`",
            TokenKind::ReplaceNew => "`replacenew`",
            TokenKind::Template => "`template`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Amp => "`&`",
            TokenKind::Pipe => "`|`",
            TokenKind::Caret => "`^`",
            TokenKind::Tilde => "`~`",
            TokenKind::ShiftLeft => "`<<`",
            TokenKind::ShiftRight => "`>>`",
            TokenKind::Comma => "`,`",
            TokenKind::Semicolon => "`;`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
        };
        f.write_str(text)
    }
}

// ---------------------------------------------------------------------------
// Tokenizer: source text → Token stream
// ---------------------------------------------------------------------------

/// Split `source` into tokens with their byte spans.
/// Lexing continues past bad characters so that all of them are reported.
pub(crate) fn tokenize(
    source: &str,
    file_id: usize,
) -> Result<Vec<(Token, Range<usize>)>, Vec<ParseError>> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0;

    while i < len {
        let start = i;
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
            }

            // Comments
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                loop {
                    if i + 1 >= len {
                        errors.push(ParseError::new(
                            "unterminated block comment",
                            start..len,
                            file_id,
                        ));
                        i = len;
                        break;
                    }
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }

            // String literal (no escapes)
            b'"' => {
                i += 1;
                while i < len && bytes[i] != b'"' && bytes[i] != b'\n' {
                    i += 1;
                }
                if i < len && bytes[i] == b'"' {
                    tokens.push((Token::StringLit(source[start + 1..i].to_string()), start..i + 1));
                    i += 1;
                } else {
                    errors.push(ParseError::new(
                        "unterminated string literal",
                        start..i,
                        file_id,
                    ));
                }
            }

            // Numbers: decimal or 0x-prefixed hexadecimal
            b'0'..=b'9' => {
                let is_hex = c == b'0' && matches!(bytes.get(i + 1), Some(b'x') | Some(b'X'));
                let digits_start = if is_hex { i + 2 } else { i };
                i = digits_start;
                while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let text = &source[digits_start..i];
                let parsed = if is_hex {
                    i64::from_str_radix(text, 16)
                } else {
                    text.parse::<i64>()
                };
                match parsed {
                    Ok(n) => tokens.push((Token::Number(n), start..i)),
                    Err(_) => errors.push(ParseError::new(
                        format!("invalid number literal '{}'", &source[start..i]),
                        start..i,
                        file_id,
                    )),
                }
            }

            // Identifiers and keywords
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let token = match &source[start..i] {
                    "replace" => Token::Replace,
                    "replacenew" => Token::ReplaceNew,
                    "template" => Token::Template,
                    ident => Token::Ident(ident.to_string()),
                };
                tokens.push((token, start..i));
            }

            // Two-character operators
            b'<' | b'>' => {
                if bytes.get(i + 1) == Some(&c) {
                    i += 2;
                    let token = if c == b'<' {
                        Token::ShiftLeft
                    } else {
                        Token::ShiftRight
                    };
                    tokens.push((token, start..i));
                } else {
                    i += 1;
                    errors.push(ParseError::new(
                        format!("unexpected character '{}'", c as char),
                        start..i,
                        file_id,
                    ));
                }
            }

            _ => {
                let single = match c {
                    b'+' => Some(Token::Plus),
                    b'-' => Some(Token::Minus),
                    b'*' => Some(Token::Star),
                    b'/' => Some(Token::Slash),
                    b'%' => Some(Token::Percent),
                    b'&' => Some(Token::Amp),
                    b'|' => Some(Token::Pipe),
                    b'^' => Some(Token::Caret),
                    b'~' => Some(Token::Tilde),
                    b',' => Some(Token::Comma),
                    b';' => Some(Token::Semicolon),
                    b'(' => Some(Token::LParen),
                    b')' => Some(Token::RParen),
                    b'{' => Some(Token::LBrace),
                    b'}' => Some(Token::RBrace),
                    b'[' => Some(Token::LBracket),
                    b']' => Some(Token::RBracket),
                    _ => None,
                };
                // Step over a whole UTF-8 character so spans stay on char boundaries.
                let width = source[i..].chars().next().map_or(1, char::len_utf8);
                i += width;
                match single {
                    Some(token) => tokens.push((token, start..i)),
                    None => errors.push(ParseError::new(
                        format!("unexpected character '{}'", &source[start..i]),
                        start..i,
                        file_id,
                    )),
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, 0)
            .expect("lex failed")
            .iter()
            .map(|(t, _)| t.kind())
            .collect()
    }

    #[test]
    fn keywords_and_punctuation() {
        assert_eq!(
            kinds("replacenew(TRAIN) { }"),
            vec![
                TokenKind::ReplaceNew,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn hex_numbers_and_shifts() {
        let tokens = tokenize("0xFFFF << 2", 0).expect("lex failed");
        assert_eq!(tokens[0], (Token::Number(0xFFFF), 0..6));
        assert_eq!(tokens[1].0, Token::ShiftLeft);
        assert_eq!(tokens[2], (Token::Number(2), 10..11));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("// line\nreplace /* block\n comment */ (1)"),
            vec![
                TokenKind::Replace,
                TokenKind::LParen,
                TokenKind::Number,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn reports_every_bad_character() {
        let errors = tokenize("replace(1) $ { @ }", 0).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].span, 11..12);
        assert_eq!(errors[1].span, 15..16);
    }

    #[test]
    fn unterminated_string() {
        let errors = tokenize("replace(1, \"abc", 0).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unterminated string"));
    }
}
