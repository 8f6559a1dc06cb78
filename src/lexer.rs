use std::fmt;

use log::trace;

use crate::token::{Keyword, Span, Token, TokenKind};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Unterminated double-quoted string.
    UnterminatedString,
    /// Backslash escape that is not recognised inside a string.
    InvalidEscape(char),
    /// Integer literal that does not fit in 64 bits.
    IntegerOverflow(String),
    /// Float literal too large to be finite.
    FloatOverflow(String),
    /// Character that cannot start any token.
    UnexpectedCharacter(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => {
                write!(f, "unterminated string")
            }
            Self::InvalidEscape(ch) => {
                write!(f, "invalid escape sequence: \\{ch}")
            }
            Self::IntegerOverflow(digits) => {
                write!(f, "integer literal too large: {digits}")
            }
            Self::FloatOverflow(digits) => {
                write!(f, "float literal too large: {digits}")
            }
            Self::UnexpectedCharacter(ch) => {
                write!(f, "unexpected character: {ch:?}")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

/// Tokenize a source string into a sequence of tokens.
///
/// The returned sequence always ends with exactly one
/// [`TokenKind::Eof`] token.
///
/// # Errors
///
/// Returns `LexError` on the first character that cannot be part
/// of any token, on unterminated strings, invalid escapes, or
/// numeric literals that overflow.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    trace!("tokenizing {} bytes", input.len());
    Lexer::new(input).tokenize()
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                '\n' => {
                    tokens.push(self.make_token(TokenKind::Newline, "\n".to_string()));
                    self.advance();
                }
                '\r' => {
                    let span = self.span();
                    self.advance();
                    if self.peek() == Some('\n') {
                        tokens.push(Token {
                            kind: TokenKind::Newline,
                            text: "\n".to_string(),
                            span,
                        });
                        self.advance();
                    }
                }
                ' ' | '\t' | '\u{000C}' => {
                    self.advance();
                }
                '/' if self.peek_at(1) == Some('/') => {
                    self.skip_comment();
                }
                '"' => {
                    tokens.push(self.read_string()?);
                }
                c if c.is_ascii_digit() => {
                    tokens.push(self.read_number()?);
                }
                c if c == '_' || c.is_alphabetic() => {
                    tokens.push(self.read_word());
                }
                _ => {
                    tokens.push(self.read_operator(ch)?);
                }
            }
        }

        tokens.push(self.make_token(TokenKind::Eof, String::new()));
        Ok(tokens)
    }

    const fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.col,
        }
    }

    const fn make_token(&self, kind: TokenKind, text: String) -> Token {
        Token {
            kind,
            text,
            span: self.span(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(&ch) = self.input.get(self.pos) {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn lexeme(&self, start: usize) -> String {
        self.input[start..self.pos].iter().collect()
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.advance();
        }
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let span = self.span();
        let start = self.pos;
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        kind: LexErrorKind::UnterminatedString,
                        span,
                    });
                }
                Some('\\') => {
                    let escape_span = self.span();
                    self.advance();
                    let decoded = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(LexError {
                                kind: LexErrorKind::InvalidEscape(other),
                                span: escape_span,
                            });
                        }
                        None => {
                            return Err(LexError {
                                kind: LexErrorKind::UnterminatedString,
                                span,
                            });
                        }
                    };
                    value.push(decoded);
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(Token {
            kind: TokenKind::Str(value),
            text: self.lexeme(start),
            span,
        })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let span = self.span();
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        let is_float =
            self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.advance(); // decimal point
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = self.lexeme(start);
        let kind = if is_float {
            match text.parse::<f64>() {
                Ok(x) if x.is_finite() => TokenKind::Float(x),
                _ => {
                    return Err(LexError {
                        kind: LexErrorKind::FloatOverflow(text),
                        span,
                    });
                }
            }
        } else {
            match text.parse() {
                Ok(n) => TokenKind::Integer(n),
                Err(_) => {
                    return Err(LexError {
                        kind: LexErrorKind::IntegerOverflow(text),
                        span,
                    });
                }
            }
        };

        Ok(Token { kind, text, span })
    }

    fn read_word(&mut self) -> Token {
        let span = self.span();
        let start = self.pos;

        while self.peek().is_some_and(|c| c == '_' || c.is_alphanumeric()) {
            self.advance();
        }

        let text = self.lexeme(start);
        let kind = Keyword::from_word(&text).map_or(TokenKind::Identifier, TokenKind::Keyword);

        Token { kind, text, span }
    }

    fn read_operator(&mut self, ch: char) -> Result<Token, LexError> {
        let span = self.span();
        let start = self.pos;
        let next = self.peek_at(1);

        let (kind, width) = match (ch, next) {
            ('=', Some('=')) => (TokenKind::EqualEqual, 2),
            ('!', Some('=')) => (TokenKind::BangEqual, 2),
            ('<', Some('=')) => (TokenKind::LessEqual, 2),
            ('>', Some('=')) => (TokenKind::GreaterEqual, 2),
            ('&', Some('&')) => (TokenKind::AndAnd, 2),
            ('|', Some('|')) => (TokenKind::OrOr, 2),
            ('=', _) => (TokenKind::Assign, 1),
            ('!', _) => (TokenKind::Bang, 1),
            ('<', _) => (TokenKind::Less, 1),
            ('>', _) => (TokenKind::Greater, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('(', _) => (TokenKind::LeftParen, 1),
            (')', _) => (TokenKind::RightParen, 1),
            ('{', _) => (TokenKind::LeftBrace, 1),
            ('}', _) => (TokenKind::RightBrace, 1),
            (',', _) => (TokenKind::Comma, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            _ => {
                return Err(LexError {
                    kind: LexErrorKind::UnexpectedCharacter(ch),
                    span,
                });
            }
        };

        for _ in 0..width {
            self.advance();
        }

        Ok(Token {
            kind,
            text: self.lexeme(start),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("should tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn print_call() {
        let tokens = tokenize("print(1 + 2 * 3)").expect("should tokenize");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["print", "(", "1", "+", "2", "*", "3", ")", ""]);
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Print));
        assert_eq!(tokens[2].kind, TokenKind::Integer(1));
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("== != <= >= && || = ! < >"),
            vec![
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Assign,
                TokenKind::Bang,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn float_literal() {
        assert_eq!(kinds("2.5"), vec![TokenKind::Float(2.5), TokenKind::Eof]);
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        let err = tokenize("1.").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('.'));
        assert_eq!(err.span, Span::new(1, 2));
    }

    #[test]
    fn string_escapes_are_decoded() {
        let tokens = tokenize(r#""a\tb\n\"c\"""#).expect("should tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Str("a\tb\n\"c\"".to_string()));
        assert_eq!(tokens[0].text, r#""a\tb\n\"c\"""#);
    }

    #[test]
    fn unterminated_string() {
        let err = tokenize("x = \"open").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.span, Span::new(1, 5));
    }

    #[test]
    fn invalid_escape() {
        let err = tokenize(r#""\q""#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidEscape('q'));
    }

    #[test]
    fn tabs_and_spaces_are_interchangeable() {
        assert_eq!(kinds("\tx\t=\t1"), kinds("  x = 1"));
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(
            kinds("x // the answer\n"),
            vec![TokenKind::Identifier, TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn crlf_is_one_newline() {
        assert_eq!(
            kinds("a\r\nb"),
            vec![TokenKind::Identifier, TokenKind::Newline, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn integer_overflow() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::IntegerOverflow(_)));
    }

    #[test]
    fn float_overflow() {
        let source = format!("1{}.0", "0".repeat(400));
        let err = tokenize(&source).unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::FloatOverflow(_)));
    }

    #[test]
    fn single_ampersand_is_rejected() {
        let err = tokenize("a & b").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('&'));
        assert_eq!(err.span, Span::new(1, 3));
    }

    #[test]
    fn span_tracking() {
        let tokens = tokenize("a\n  bb c").expect("should tokenize");
        assert_eq!(tokens[0].span, Span::new(1, 1));
        assert_eq!(tokens[1].span, Span::new(1, 2));
        assert_eq!(tokens[2].span, Span::new(2, 3));
        assert_eq!(tokens[3].span, Span::new(2, 6));
    }

    #[test]
    fn bom_stripping() {
        let tokens = tokenize("\u{FEFF}x").expect("should tokenize");
        assert_eq!(tokens[0].text, "x");
        assert_eq!(tokens[0].span, Span::new(1, 1));
    }
}
