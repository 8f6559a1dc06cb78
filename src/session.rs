//! Interpreter sessions: one isolated lex, parse and run over one source text.

use log::debug;

use crate::Error;
use crate::ast::Program;
use crate::evaluator::{Evaluator, Limits};
use crate::lexer::{LexError, tokenize};
use crate::parser::{ParseError, parse};
use crate::token::Token;
use crate::value::Value;

/// Creates independent sessions that share only their configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFactory {
    limits: Limits,
}

impl SessionFactory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limits: Limits::new(),
        }
    }

    /// Factory whose sessions evaluate under `limits`.
    #[must_use]
    pub const fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    /// Create a fresh session for `source`.
    #[must_use]
    pub fn create_session(&self, source: &str) -> Session {
        Session::new(source).with_limits(self.limits)
    }
}

/// One run of the pipeline over one source text.
///
/// A session owns its output buffer, its error log, and the tree of
/// its last run; nothing is shared with other sessions.
#[derive(Debug, Clone)]
pub struct Session {
    source: String,
    limits: Limits,
    output: Vec<String>,
    errors: Vec<Error>,
    program: Option<Program>,
    result: Option<Value>,
}

impl Session {
    #[must_use]
    pub fn new(source: &str) -> Self {
        debug!("new session over {} bytes", source.len());
        Self {
            source: source.to_string(),
            limits: Limits::default(),
            output: Vec::new(),
            errors: Vec::new(),
            program: None,
            result: None,
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tokenize the session's source without running it.
    ///
    /// # Errors
    ///
    /// Returns the `LexError` for the first invalid character.
    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        tokenize(&self.source)
    }

    /// Parse tokens (normally from [`Session::lex`]) without running them.
    ///
    /// # Errors
    ///
    /// Returns the `ParseError` for the first unexpected token.
    #[allow(clippy::unused_self)]
    pub fn parse(&self, tokens: &[Token]) -> Result<Program, ParseError> {
        parse(tokens)
    }

    /// Lex, parse, and evaluate the source.
    ///
    /// Each call starts from an empty output buffer and a fresh
    /// global scope. Output printed before a failure stays available
    /// through [`Session::combined_output`], and the failure is also
    /// appended to [`Session::errors`].
    ///
    /// # Errors
    ///
    /// Returns the first lex, parse, or runtime error. Later stages
    /// do not run after an earlier one fails.
    pub fn run(&mut self) -> Result<(), Error> {
        self.output.clear();
        self.result = None;

        let outcome = self.execute();
        match &outcome {
            Ok(()) => debug!("run finished with {} output segment(s)", self.output.len()),
            Err(e) => {
                debug!("run failed: {e}");
                self.errors.push(e.clone());
            }
        }
        outcome
    }

    fn execute(&mut self) -> Result<(), Error> {
        let tokens = self.lex()?;
        let program = self.parse(&tokens)?;
        drop(tokens);

        let mut evaluator = Evaluator::new(&mut self.output, self.limits);
        let result = evaluator.evaluate(&program);
        drop(evaluator);

        self.program = Some(program);
        self.result = Some(result?);
        Ok(())
    }

    /// Everything printed so far, one line per `print`.
    #[must_use]
    pub fn combined_output(&self) -> String {
        self.output.join("\n")
    }

    /// Printed segments in order.
    #[must_use]
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Every failure recorded by [`Session::run`], oldest first.
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Tree of the last run that got past parsing.
    #[must_use]
    pub const fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// Value of the last top-level expression of the last successful run.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }
}
