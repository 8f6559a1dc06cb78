use std::fmt;
use std::ops::Range;

use crate::token::Span;

/// Complete program: the root of every parsed tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A statement with its source location.
///
/// `tokens` is the half-open range of token indices the statement
/// was parsed from. Nodes built programmatically carry an empty range.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    pub tokens: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its effect (or value at top level).
    Expr(Expr),
    /// `let name = value`, declaring in the innermost scope.
    Let { name: String, value: Option<Expr> },
    /// `print(a, b, ...)`.
    Print(Vec<Expr>),
    /// `{ ... }`.
    Block(Vec<Stmt>),
    /// `if cond { ... } else ...`; the else branch is a block or another `if`.
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `while cond { ... }`.
    While { condition: Expr, body: Vec<Stmt> },
    /// `fn name(params) { ... }`.
    Function(Function),
    /// `return` with an optional value.
    Return(Option<Expr>),
    Break,
    Continue,
}

/// Named function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// An expression with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub tokens: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// Reference to a named binding.
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuiting `&&` / `||`.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `name = value`; right-associative, yields the assigned value.
    Assign {
        name: String,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

/// Literal value as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Negate,
    /// `!x`
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

/// Binding strength of an operator level. Higher binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
}

impl UnaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "!",
        }
    }
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Remainder => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
        }
    }

    #[must_use]
    pub const fn precedence(self) -> Precedence {
        match self {
            Self::Add | Self::Subtract => Precedence::Term,
            Self::Multiply | Self::Divide | Self::Remainder => Precedence::Factor,
            Self::Equal | Self::NotEqual => Precedence::Equality,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual => {
                Precedence::Comparison
            }
        }
    }
}

impl LogicalOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    #[must_use]
    pub const fn precedence(self) -> Precedence {
        match self {
            Self::And => Precedence::And,
            Self::Or => Precedence::Or,
        }
    }
}

impl Expr {
    /// Precedence of the construct at the top of this expression.
    #[must_use]
    pub fn precedence(&self) -> Precedence {
        match &self.kind {
            ExprKind::Literal(Literal::Integer(n)) if *n < 0 => Precedence::Unary,
            ExprKind::Literal(Literal::Float(x)) if x.is_sign_negative() => Precedence::Unary,
            ExprKind::Literal(_) | ExprKind::Variable(_) | ExprKind::Call { .. } => {
                Precedence::Call
            }
            ExprKind::Unary { .. } => Precedence::Unary,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Logical { op, .. } => op.precedence(),
            ExprKind::Assign { .. } => Precedence::Assignment,
        }
    }
}

impl fmt::Display for Literal {
    /// Source form of the literal; strings are quoted and escaped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => f.write_str(&float_text(*x)),
            Self::Str(s) => {
                f.write_str("\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        '\0' => f.write_str("\\0")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

/// Plain decimal text for a float, always with a fractional part.
///
/// Never uses exponent notation, so the text lexes back as a float
/// literal for any finite non-negative value.
pub(crate) fn float_text(x: f64) -> String {
    let text = x.to_string();
    if x.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}
