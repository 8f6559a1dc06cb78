//! Lexer, parser, formatter, and tree-walking interpreter for a small
//! dynamically typed scripting language.
//!
//! Source text goes through [`tokenize`], [`parse`], and finally an
//! [`Evaluator`] that writes `print` output into a buffer. A
//! [`Session`] wraps the three stages for one source text and keeps
//! the output and errors of its runs.
//!
//! # Quick start
//!
//! ## Run a program
//!
//! ```
//! let (output, error) = yaj::run("let x = 1 + 2 * 3\nprint(x)");
//! assert_eq!(output, "7");
//! assert!(error.is_none());
//! ```
//!
//! ## Parse and re-format source
//!
//! ```
//! use yaj::{tokenize, parse, format};
//!
//! let input = "fn add(a, b) {\n    return a + b\n}\nprint(add(1, 2))\n";
//! let tokens = tokenize(input).unwrap();
//! let program = parse(&tokens).unwrap();
//! assert_eq!(format(&program), input);
//! ```
//!
//! ## Build a program in code
//!
//! ```
//! use yaj::{BinaryOp, Expr, Program, Stmt, format};
//!
//! let program = Program::new()
//!     .statement(Stmt::declare("x", Expr::int(2)))
//!     .statement(Stmt::print(vec![Expr::binary(
//!         BinaryOp::Multiply,
//!         Expr::var("x"),
//!         Expr::int(21),
//!     )]));
//!
//! assert_eq!(format(&program), "let x = 2\nprint(x * 21)\n");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use log::trace;

pub mod ast;
pub mod builder;
pub mod evaluator;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod session;
pub mod token;
pub mod tree;
pub mod value;

pub use ast::{
    BinaryOp, Expr, ExprKind, Function, Literal, LogicalOp, Precedence, Program, Stmt, StmtKind,
    UnaryOp,
};
pub use evaluator::{Evaluator, Limits, RuntimeError, RuntimeErrorKind};
pub use formatter::{format, format_expression};
pub use lexer::{LexError, LexErrorKind, tokenize};
pub use parser::{MAX_NESTING, ParseError, ParseErrorKind, parse};
pub use session::{Session, SessionFactory};
pub use token::{Keyword, Span, Token, TokenKind};
pub use tree::render;
pub use value::{Builtin, Value};

/// Unified error type covering every stage of a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// An evaluation error.
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

impl Error {
    /// Source position the error points at.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Lex(e) => e.span,
            Self::Parse(e) => e.span,
            Self::Runtime(e) => e.span,
        }
    }
}

/// Tokenize and parse a source string in one step.
pub fn parse_str(input: &str) -> Result<Program, Error> {
    let tokens = tokenize(input)?;
    Ok(parse(&tokens)?)
}

/// Run `source` in a fresh session.
///
/// Returns everything printed, joined with newlines, together with
/// the error that stopped the run, if any. Output printed before a
/// runtime error is kept.
#[must_use]
pub fn run(source: &str) -> (String, Option<Error>) {
    let mut session = Session::new(source);
    let error = session.run().err();
    trace!("run: {} segment(s), failed: {}", session.output().len(), error.is_some());
    (session.combined_output(), error)
}
