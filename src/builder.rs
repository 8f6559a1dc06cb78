//! Constructors for building syntax trees without source text.
//!
//! Nodes built here carry `Span::default()` and an empty token
//! range; [`crate::format`] turns them into source that parses back
//! into the same shape.

use crate::ast::{
    BinaryOp, Expr, ExprKind, Function, Literal, LogicalOp, Program, Stmt, StmtKind, UnaryOp,
};
use crate::token::Span;

impl Program {
    /// Create a new empty program.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            statements: Vec::new(),
        }
    }

    /// Append a statement.
    #[must_use]
    pub fn statement(mut self, stmt: Stmt) -> Self {
        self.statements.push(stmt);
        self
    }
}

impl Stmt {
    /// Wrap a statement kind with no source position.
    #[must_use]
    pub const fn synthetic(kind: StmtKind) -> Self {
        Self {
            kind,
            span: Span { line: 1, column: 1 },
            tokens: 0..0,
        }
    }

    /// Expression statement.
    #[must_use]
    pub const fn expr(expr: Expr) -> Self {
        Self::synthetic(StmtKind::Expr(expr))
    }

    /// `let name = value`.
    #[must_use]
    pub fn declare(name: &str, value: Expr) -> Self {
        Self::synthetic(StmtKind::Let {
            name: name.to_string(),
            value: Some(value),
        })
    }

    /// `print(args...)`.
    #[must_use]
    pub const fn print(arguments: Vec<Expr>) -> Self {
        Self::synthetic(StmtKind::Print(arguments))
    }

    /// `{ ... }`.
    #[must_use]
    pub const fn block(statements: Vec<Self>) -> Self {
        Self::synthetic(StmtKind::Block(statements))
    }

    /// `if condition { ... }` without an else branch.
    #[must_use]
    pub const fn when(condition: Expr, then_branch: Vec<Self>) -> Self {
        Self::synthetic(StmtKind::If {
            condition,
            then_branch,
            else_branch: None,
        })
    }

    /// Attach an else branch to an `if` statement.
    ///
    /// The branch must be a block or another `if`; any other
    /// statement is wrapped in a block. Has no effect on statements
    /// that are not `if`.
    #[must_use]
    pub fn otherwise(mut self, branch: Self) -> Self {
        if let StmtKind::If { else_branch, .. } = &mut self.kind {
            let branch = match branch.kind {
                StmtKind::If { .. } | StmtKind::Block(_) => branch,
                _ => Self::block(vec![branch]),
            };
            *else_branch = Some(Box::new(branch));
        }
        self
    }

    /// `while condition { ... }`.
    #[must_use]
    pub const fn repeat(condition: Expr, body: Vec<Self>) -> Self {
        Self::synthetic(StmtKind::While { condition, body })
    }

    /// `fn name(params) { ... }`.
    #[must_use]
    pub fn function(name: &str, params: &[&str], body: Vec<Self>) -> Self {
        Self::synthetic(StmtKind::Function(Function {
            name: name.to_string(),
            params: params.iter().map(ToString::to_string).collect(),
            body,
        }))
    }

    /// `return value` (or bare `return`).
    #[must_use]
    pub const fn ret(value: Option<Expr>) -> Self {
        Self::synthetic(StmtKind::Return(value))
    }
}

impl Expr {
    /// Wrap an expression kind with no source position.
    #[must_use]
    pub const fn synthetic(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span { line: 1, column: 1 },
            tokens: 0..0,
        }
    }

    #[must_use]
    pub const fn nil() -> Self {
        Self::synthetic(ExprKind::Literal(Literal::Nil))
    }

    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Self::synthetic(ExprKind::Literal(Literal::Bool(value)))
    }

    #[must_use]
    pub const fn int(value: i64) -> Self {
        Self::synthetic(ExprKind::Literal(Literal::Integer(value)))
    }

    #[must_use]
    pub const fn float(value: f64) -> Self {
        Self::synthetic(ExprKind::Literal(Literal::Float(value)))
    }

    #[must_use]
    pub fn string(value: &str) -> Self {
        Self::synthetic(ExprKind::Literal(Literal::Str(value.to_string())))
    }

    /// Reference to a variable.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::synthetic(ExprKind::Variable(name.to_string()))
    }

    #[must_use]
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::synthetic(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::synthetic(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    #[must_use]
    pub fn logical(op: LogicalOp, left: Self, right: Self) -> Self {
        Self::synthetic(ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// `name = value`.
    #[must_use]
    pub fn assign(name: &str, value: Self) -> Self {
        Self::synthetic(ExprKind::Assign {
            name: name.to_string(),
            value: Box::new(value),
        })
    }

    /// Call an arbitrary callee expression.
    #[must_use]
    pub fn call(callee: Self, arguments: Vec<Self>) -> Self {
        Self::synthetic(ExprKind::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    /// Call a function by name.
    #[must_use]
    pub fn call_named(name: &str, arguments: Vec<Self>) -> Self {
        Self::call(Self::var(name), arguments)
    }
}
