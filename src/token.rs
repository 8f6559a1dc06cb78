use std::fmt;

/// Source location for error reporting.
///
/// Both fields are 1-based; `column` counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Let,
    Fn,
    Return,
    If,
    Else,
    While,
    Break,
    Continue,
    Print,
    True,
    False,
    Nil,
}

impl Keyword {
    /// Look up the keyword spelled by `word`, if any.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "let" => Self::Let,
            "fn" => Self::Fn,
            "return" => Self::Return,
            "if" => Self::If,
            "else" => Self::Else,
            "while" => Self::While,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "print" => Self::Print,
            "true" => Self::True,
            "false" => Self::False,
            "nil" => Self::Nil,
            _ => return None,
        };
        Some(keyword)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Let => "let",
            Self::Fn => "fn",
            Self::Return => "return",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Print => "print",
            Self::True => "true",
            Self::False => "false",
            Self::Nil => "nil",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token kinds produced by the lexer.
///
/// Literal kinds carry their decoded value; the raw lexeme stays in
/// [`Token::text`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer literal (`42`).
    Integer(i64),
    /// Float literal (`4.2`).
    Float(f64),
    /// Double-quoted string with escapes already decoded.
    Str(String),
    /// Name that is not a keyword.
    Identifier,
    /// Reserved word.
    Keyword(Keyword),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    /// `=`
    Assign,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,
    /// Line separator.
    Newline,
    /// End of input; always the last token.
    Eof,
}

impl TokenKind {
    /// Short human-readable name, used in diagnostics and token dumps.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Identifier => "identifier",
            Self::Keyword(_) => "keyword",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::Bang => "'!'",
            Self::Assign => "'='",
            Self::EqualEqual => "'=='",
            Self::BangEqual => "'!='",
            Self::Less => "'<'",
            Self::LessEqual => "'<='",
            Self::Greater => "'>'",
            Self::GreaterEqual => "'>='",
            Self::AndAnd => "'&&'",
            Self::OrOr => "'||'",
            Self::LeftParen => "'('",
            Self::RightParen => "')'",
            Self::LeftBrace => "'{'",
            Self::RightBrace => "'}'",
            Self::Comma => "','",
            Self::Semicolon => "';'",
            Self::Newline => "newline",
            Self::Eof => "end of input",
        }
    }
}

/// A single token with its kind, text, and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    /// Whether this token is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "{} newline", self.span),
            TokenKind::Eof => write!(f, "{} eof", self.span),
            _ => write!(f, "{} {} {}", self.span, self.kind.describe(), self.text),
        }
    }
}
