use std::fmt;

use log::trace;

use crate::ast::{
    BinaryOp, Expr, ExprKind, Function, Literal, LogicalOp, Program, Stmt, StmtKind, UnaryOp,
};
use crate::token::{Keyword, Span, Token, TokenKind};

/// Deepest nesting of blocks and sub-expressions the parser accepts.
pub const MAX_NESTING: usize = 100;

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token that cannot start or continue the current construct.
    UnexpectedToken { found: String, expected: String },
    /// Input ended in the middle of a construct.
    UnexpectedEof { expected: String },
    /// Left-hand side of `=` is not a plain name.
    InvalidAssignmentTarget,
    /// `return` outside of any function body.
    ReturnOutsideFunction,
    /// `break` or `continue` outside of any loop body.
    LoopControlOutsideLoop { keyword: Keyword },
    /// The same parameter name appears twice in one function.
    DuplicateParameter { name: String },
    /// Blocks or expressions nested deeper than [`MAX_NESTING`].
    NestingTooDeep { limit: usize },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found, expected } => {
                write!(f, "expected {expected}, got '{found}'")
            }
            Self::UnexpectedEof { expected } => {
                write!(f, "expected {expected}, got end of input")
            }
            Self::InvalidAssignmentTarget => {
                write!(f, "invalid assignment target")
            }
            Self::ReturnOutsideFunction => {
                write!(f, "'return' outside of a function")
            }
            Self::LoopControlOutsideLoop { keyword } => {
                write!(f, "'{keyword}' outside of a loop")
            }
            Self::DuplicateParameter { name } => {
                write!(f, "duplicate parameter '{name}'")
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "nesting deeper than {limit} levels")
            }
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Parse a token stream into a `Program` AST.
///
/// The stream is normally the output of [`crate::tokenize`]; a
/// missing trailing end-of-input token is tolerated.
///
/// # Errors
///
/// Returns `ParseError` on the first token that cannot start or
/// continue the current construct. No partial tree is returned.
pub fn parse(tokens: &[Token]) -> Result<Program, ParseError> {
    trace!("parsing {} tokens", tokens.len());
    Parser::new(tokens).parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    function_depth: usize,
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            function_depth: 0,
            loop_depth: 0,
        }
    }

    fn parse(mut self) -> Result<Program, ParseError> {
        let statements = self.parse_statements(false)?;
        if !self.at_end() {
            return Err(self.unexpected("statement"));
        }
        Ok(Program { statements })
    }

    /// Parse separated statements until `}` (inside a block) or end of input.
    fn parse_statements(&mut self, in_block: bool) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        loop {
            self.skip_separators();

            if self.at_end() || (in_block && self.check(&TokenKind::RightBrace)) {
                break;
            }

            statements.push(self.parse_statement()?);

            match self.peek_kind() {
                Some(TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof) | None => {}
                Some(TokenKind::RightBrace) if in_block => {}
                Some(_) => return Err(self.unexpected("newline or ';'")),
            }
        }

        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.pos;
        let span = self.current_span();

        let kind = match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Let)) => self.parse_let()?,
            Some(TokenKind::Keyword(Keyword::Fn)) => self.parse_function()?,
            Some(TokenKind::Keyword(Keyword::If)) => return self.parse_if(),
            Some(TokenKind::Keyword(Keyword::While)) => self.parse_while()?,
            Some(TokenKind::Keyword(Keyword::Return)) => self.parse_return()?,
            Some(TokenKind::Keyword(keyword @ (Keyword::Break | Keyword::Continue))) => {
                let keyword = *keyword;
                if self.loop_depth == 0 {
                    return Err(ParseError {
                        kind: ParseErrorKind::LoopControlOutsideLoop { keyword },
                        span,
                    });
                }
                self.pos += 1;
                if keyword == Keyword::Break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                }
            }
            Some(TokenKind::Keyword(Keyword::Print)) => self.parse_print()?,
            Some(TokenKind::LeftBrace) => StmtKind::Block(self.parse_block()?),
            _ => StmtKind::Expr(self.parse_expression()?),
        };

        Ok(Stmt {
            kind,
            span,
            tokens: start..self.pos,
        })
    }

    fn parse_let(&mut self) -> Result<StmtKind, ParseError> {
        self.pos += 1; // let
        let name = self.expect_identifier("variable name")?;

        let value = if self.check(&TokenKind::Assign) {
            self.pos += 1;
            self.skip_newlines();
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(StmtKind::Let { name, value })
    }

    fn parse_function(&mut self) -> Result<StmtKind, ParseError> {
        self.pos += 1; // fn
        let name = self.expect_identifier("function name")?;
        self.expect(&TokenKind::LeftParen, "'('")?;
        self.skip_newlines();

        let mut params: Vec<String> = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let span = self.current_span();
                let param = self.expect_identifier("parameter name")?;
                if params.contains(&param) {
                    return Err(ParseError {
                        kind: ParseErrorKind::DuplicateParameter { name: param },
                        span,
                    });
                }
                params.push(param);
                self.skip_newlines();
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.pos += 1;
                self.skip_newlines();
            }
        }
        self.expect(&TokenKind::RightParen, "')'")?;

        // A function body is a fresh loop context.
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;
        self.loop_depth = outer_loops;

        Ok(StmtKind::Function(Function {
            name,
            params,
            body: body?,
        }))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.pos;
        let span = self.current_span();
        self.pos += 1; // if

        let condition = self.parse_expression()?;
        let then_branch = self.parse_block()?;

        // `else` may sit on the line after the closing brace.
        let before_else = self.pos;
        self.skip_newlines();
        let else_branch = if self.check_keyword(Keyword::Else) {
            self.pos += 1;
            let branch = if self.check_keyword(Keyword::If) {
                // Each `else if` nests one level deeper.
                self.enter()?;
                let nested = self.parse_if();
                self.leave();
                nested?
            } else {
                let block_start = self.pos;
                let block_span = self.current_span();
                let body = self.parse_block()?;
                Stmt {
                    kind: StmtKind::Block(body),
                    span: block_span,
                    tokens: block_start..self.pos,
                }
            };
            Some(Box::new(branch))
        } else {
            self.pos = before_else;
            None
        };

        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span,
            tokens: start..self.pos,
        })
    }

    fn parse_while(&mut self) -> Result<StmtKind, ParseError> {
        self.pos += 1; // while
        let condition = self.parse_expression()?;

        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;

        Ok(StmtKind::While {
            condition,
            body: body?,
        })
    }

    fn parse_return(&mut self) -> Result<StmtKind, ParseError> {
        if self.function_depth == 0 {
            return Err(ParseError {
                kind: ParseErrorKind::ReturnOutsideFunction,
                span: self.current_span(),
            });
        }
        self.pos += 1; // return

        let value = match self.peek_kind() {
            Some(
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof,
            )
            | None => None,
            Some(_) => Some(self.parse_expression()?),
        };

        Ok(StmtKind::Return(value))
    }

    fn parse_print(&mut self) -> Result<StmtKind, ParseError> {
        self.pos += 1; // print
        self.expect(&TokenKind::LeftParen, "'(' after 'print'")?;
        let arguments = self.parse_arguments()?;
        Ok(StmtKind::Print(arguments))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LeftBrace, "'{'")?;
        self.enter()?;
        let statements = self.parse_statements(true)?;
        self.leave();
        self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(statements)
    }

    /// Comma-separated expressions after an already consumed `(`,
    /// including the closing `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut arguments = Vec::new();
        self.skip_newlines();

        if !self.check(&TokenKind::RightParen) {
            loop {
                arguments.push(self.parse_expression()?);
                self.skip_newlines();
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.pos += 1;
                self.skip_newlines();
            }
        }

        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(arguments)
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.parse_assignment();
        self.leave();
        expr
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let target = self.parse_or()?;

        if !self.check(&TokenKind::Assign) {
            return Ok(target);
        }

        let span = self.current_span();
        let target_span = target.span;
        // `(x)` parses to the bare variable; its tokens exclude the parentheses.
        if target.tokens != (start..self.pos) {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidAssignmentTarget,
                span: target_span,
            });
        }
        let ExprKind::Variable(name) = target.kind else {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidAssignmentTarget,
                span: target_span,
            });
        };
        self.pos += 1; // =
        self.skip_newlines();
        let value = self.parse_expression()?;

        Ok(Expr {
            kind: ExprKind::Assign {
                name,
                value: Box::new(value),
            },
            span,
            tokens: start..self.pos,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let depth = self.depth;
        let mut left = self.parse_and()?;
        let mut chained = false;

        while self.check(&TokenKind::OrOr) {
            if std::mem::replace(&mut chained, true) {
                self.enter()?;
            }
            let span = self.advance_operator();
            let right = self.parse_and()?;
            left = Self::logical(LogicalOp::Or, left, right, span, start..self.pos);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let depth = self.depth;
        let mut left = self.parse_equality()?;
        let mut chained = false;

        while self.check(&TokenKind::AndAnd) {
            if std::mem::replace(&mut chained, true) {
                self.enter()?;
            }
            let span = self.advance_operator();
            let right = self.parse_equality()?;
            left = Self::logical(LogicalOp::And, left, right, span, start..self.pos);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            |kind| match kind {
                TokenKind::EqualEqual => Some(BinaryOp::Equal),
                TokenKind::BangEqual => Some(BinaryOp::NotEqual),
                _ => None,
            },
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            |kind| match kind {
                TokenKind::Less => Some(BinaryOp::Less),
                TokenKind::LessEqual => Some(BinaryOp::LessEqual),
                TokenKind::Greater => Some(BinaryOp::Greater),
                TokenKind::GreaterEqual => Some(BinaryOp::GreaterEqual),
                _ => None,
            },
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            |kind| match kind {
                TokenKind::Plus => Some(BinaryOp::Add),
                TokenKind::Minus => Some(BinaryOp::Subtract),
                _ => None,
            },
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            |kind| match kind {
                TokenKind::Star => Some(BinaryOp::Multiply),
                TokenKind::Slash => Some(BinaryOp::Divide),
                TokenKind::Percent => Some(BinaryOp::Remainder),
                _ => None,
            },
            Self::parse_unary,
        )
    }

    /// One left-associative precedence level: `operand (op operand)*`.
    ///
    /// Every operator after the first wraps the tree built so far one
    /// level deeper, so long chains count toward [`MAX_NESTING`].
    fn parse_binary_level(
        &mut self,
        operator: fn(&TokenKind) -> Option<BinaryOp>,
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let start = self.pos;
        let depth = self.depth;
        let mut left = operand(self)?;
        let mut chained = false;

        while let Some(op) = self.peek_kind().and_then(operator) {
            if std::mem::replace(&mut chained, true) {
                self.enter()?;
            }
            let span = self.advance_operator();
            let right = operand(self)?;
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
                tokens: start..self.pos,
            };
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let span = self.current_span();

        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => UnaryOp::Negate,
            Some(TokenKind::Bang) => UnaryOp::Not,
            _ => return self.parse_call(),
        };
        self.pos += 1;

        self.enter()?;
        let operand = self.parse_unary();
        self.leave();

        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand?),
            },
            span,
            tokens: start..self.pos,
        })
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let depth = self.depth;
        let mut expr = self.parse_primary()?;
        let mut chained = false;

        while self.check(&TokenKind::LeftParen) {
            if std::mem::replace(&mut chained, true) {
                self.enter()?;
            }
            let span = self.current_span();
            self.pos += 1;
            let arguments = self.parse_arguments()?;
            expr = Expr {
                kind: ExprKind::Call {
                    callee: Box::new(expr),
                    arguments,
                },
                span,
                tokens: start..self.pos,
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let span = self.current_span();

        let kind = match self.peek_kind() {
            Some(TokenKind::Integer(n)) => ExprKind::Literal(Literal::Integer(*n)),
            Some(TokenKind::Float(x)) => ExprKind::Literal(Literal::Float(*x)),
            Some(TokenKind::Str(s)) => ExprKind::Literal(Literal::Str(s.clone())),
            Some(TokenKind::Keyword(Keyword::True)) => ExprKind::Literal(Literal::Bool(true)),
            Some(TokenKind::Keyword(Keyword::False)) => ExprKind::Literal(Literal::Bool(false)),
            Some(TokenKind::Keyword(Keyword::Nil)) => ExprKind::Literal(Literal::Nil),
            Some(TokenKind::Identifier) => ExprKind::Variable(self.tokens[self.pos].text.clone()),
            Some(TokenKind::LeftParen) => {
                self.pos += 1;
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(&TokenKind::RightParen, "')'")?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.pos += 1;

        Ok(Expr {
            kind,
            span,
            tokens: start..self.pos,
        })
    }

    fn logical(
        op: LogicalOp,
        left: Expr,
        right: Expr,
        span: Span,
        tokens: std::ops::Range<usize>,
    ) -> Expr {
        Expr {
            kind: ExprKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
            tokens,
        }
    }

    /// Consume a binary operator, allowing the operand on the next line.
    fn advance_operator(&mut self) -> Span {
        let span = self.current_span();
        self.pos += 1;
        self.skip_newlines();
        span
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError {
                kind: ParseErrorKind::NestingTooDeep { limit: MAX_NESTING },
                span: self.current_span(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    const fn leave(&mut self) {
        self.depth -= 1;
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.tokens
            .get(self.pos)
            .is_some_and(|t| t.is_keyword(keyword))
    }

    fn at_end(&self) -> bool {
        matches!(self.peek_kind(), None | Some(TokenKind::Eof))
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.pos += 1;
        }
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Newline | TokenKind::Semicolon)
        ) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == TokenKind::Identifier => {
                self.pos += 1;
                Ok(token.text.clone())
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Error for the current token, which does not fit `expected`.
    fn unexpected(&self, expected: &str) -> ParseError {
        let expected = expected.to_string();
        match self.tokens.get(self.pos) {
            None
            | Some(Token {
                kind: TokenKind::Eof,
                ..
            }) => ParseError {
                kind: ParseErrorKind::UnexpectedEof { expected },
                span: self.current_span(),
            },
            Some(token) => {
                let found = match token.kind {
                    TokenKind::Newline => "newline".to_string(),
                    _ => token.text.clone(),
                };
                ParseError {
                    kind: ParseErrorKind::UnexpectedToken { found, expected },
                    span: token.span,
                }
            }
        }
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or_else(Span::default, |t| t.span)
    }
}
