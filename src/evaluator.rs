use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

use log::{debug, trace};

use crate::ast::{
    BinaryOp, Expr, ExprKind, Function, Literal, LogicalOp, Program, Stmt, StmtKind, UnaryOp,
};
use crate::scope::{ScopeId, Scopes};
use crate::token::Span;
use crate::value::{Builtin, FunctionId, Value};

/// Default bound on nested function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Default bound on statements and expressions being evaluated at
/// once, across all active calls.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Resource bounds for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_call_depth: usize,
    pub max_depth: usize,
}

impl Limits {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set how many calls may be active at once.
    #[must_use]
    pub const fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set how deeply evaluation may recurse through nested
    /// statements, expressions and calls combined.
    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies a runtime error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Name not bound in any enclosing scope.
    UndefinedName { name: String },
    /// Operand types the operator does not support.
    Type {
        operation: String,
        left: &'static str,
        right: Option<&'static str>,
    },
    /// Integer or float division (or remainder) by zero.
    DivisionByZero,
    /// Argument count differs from the parameter count.
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// Call on a value that is not a function.
    NotCallable { type_name: &'static str },
    /// Integer arithmetic left the 64-bit range.
    IntegerOverflow,
    /// More nested calls than [`Limits::max_call_depth`].
    CallDepthExceeded { limit: usize },
    /// Evaluation recursed deeper than [`Limits::max_depth`].
    DepthExceeded { limit: usize },
    /// `return`, `break` or `continue` reached a boundary it cannot
    /// cross. Only possible in trees not produced by the parser.
    InvalidControlFlow { statement: &'static str },
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedName { name } => write!(f, "undefined name '{name}'"),
            Self::Type {
                operation,
                left,
                right: Some(right),
            } => write!(
                f,
                "unsupported operand types for {operation}: {left} and {right}"
            ),
            Self::Type {
                operation,
                left,
                right: None,
            } => write!(f, "unsupported operand type for {operation}: {left}"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::Arity {
                name,
                expected,
                actual,
            } => write!(
                f,
                "{name} expects {expected} argument(s), got {actual}"
            ),
            Self::NotCallable { type_name } => {
                write!(f, "value of type {type_name} is not callable")
            }
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::CallDepthExceeded { limit } => {
                write!(f, "more than {limit} nested calls")
            }
            Self::DepthExceeded { limit } => {
                write!(f, "evaluation nested deeper than {limit} levels")
            }
            Self::InvalidControlFlow { statement } => {
                write!(f, "'{statement}' outside of its enclosing construct")
            }
        }
    }
}

/// Error produced while evaluating a program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub span: Span,
}

impl RuntimeError {
    const fn new(kind: RuntimeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// How a statement finished.
#[derive(Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// A function value: its definition and the scope it was defined in.
#[derive(Debug, Clone)]
struct Closure<'p> {
    function: &'p Function,
    scope: ScopeId,
    /// Dead once every value naming this closure is gone.
    handle: Weak<()>,
}

/// Tree-walking evaluator for one program run.
///
/// Output from `print` statements is appended to the borrowed
/// buffer as it happens, so it survives a failed run.
pub struct Evaluator<'p, 'o> {
    scopes: Scopes,
    functions: Vec<Option<Closure<'p>>>,
    free_functions: Vec<usize>,
    output: &'o mut Vec<String>,
    call_depth: usize,
    depth: usize,
    limits: Limits,
}

impl<'p, 'o> Evaluator<'p, 'o> {
    /// Create an evaluator whose global scope holds only the builtins.
    #[must_use]
    pub fn new(output: &'o mut Vec<String>, limits: Limits) -> Self {
        let mut scopes = Scopes::new();
        let global = scopes.global();
        for builtin in Builtin::ALL {
            scopes.declare(global, builtin.name(), Value::Builtin(builtin));
        }

        Self {
            scopes,
            functions: Vec::new(),
            free_functions: Vec::new(),
            output,
            call_depth: 0,
            depth: 0,
            limits,
        }
    }

    /// Run every top-level statement in order.
    ///
    /// Returns the value of the last top-level expression statement,
    /// or `nil` if there was none.
    ///
    /// # Errors
    ///
    /// Returns the first `RuntimeError`; the remaining statements do
    /// not run.
    pub fn evaluate(&mut self, program: &'p Program) -> Result<Value, RuntimeError> {
        trace!("evaluating {} statements", program.statements.len());
        let global = self.scopes.global();
        let mut last = Value::Nil;

        for stmt in &program.statements {
            if let StmtKind::Expr(expr) = &stmt.kind {
                last = self.eval(expr, global)?;
                continue;
            }
            match self.execute(stmt, global)? {
                Flow::Normal => {}
                flow => return Err(Self::misplaced(&flow, stmt.span)),
            }
        }

        Ok(last)
    }

    /// The scope arena, for inspecting bindings after a run.
    #[must_use]
    pub const fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    fn execute(&mut self, stmt: &'p Stmt, scope: ScopeId) -> Result<Flow, RuntimeError> {
        self.descend(stmt.span)?;
        let flow = self.execute_stmt(stmt, scope);
        self.depth -= 1;
        flow
    }

    fn execute_stmt(&mut self, stmt: &'p Stmt, scope: ScopeId) -> Result<Flow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr, scope)?;
            }
            StmtKind::Let { name, value } => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Nil,
                };
                self.scopes.declare(scope, name, value);
            }
            StmtKind::Print(arguments) => {
                let mut parts = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    parts.push(self.eval(argument, scope)?.to_string());
                }
                let segment = parts.join(" ");
                trace!("print {segment:?}");
                self.output.push(segment);
            }
            StmtKind::Block(statements) => return self.execute_scoped(statements, scope),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, scope)?.is_truthy() {
                    return self.execute_scoped(then_branch, scope);
                }
                if let Some(branch) = else_branch {
                    return self.execute(branch, scope);
                }
            }
            StmtKind::While { condition, body } => {
                while self.eval(condition, scope)?.is_truthy() {
                    match self.execute_scoped(body, scope)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::Function(function) => {
                let id = self.define(function, scope);
                self.scopes.declare(
                    scope,
                    &function.name,
                    Value::Function {
                        id,
                        name: function.name.clone(),
                    },
                );
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` in a fresh child of `parent`, releasing it on
    /// every exit path.
    fn execute_scoped(
        &mut self,
        statements: &'p [Stmt],
        parent: ScopeId,
    ) -> Result<Flow, RuntimeError> {
        let scope = self.scopes.push(parent);
        let flow = self.execute_all(statements, scope);
        self.end_activation(scope);
        flow
    }

    fn execute_all(
        &mut self,
        statements: &'p [Stmt],
        scope: ScopeId,
    ) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            match self.execute(stmt, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, expr: &'p Expr, scope: ScopeId) -> Result<Value, RuntimeError> {
        self.descend(expr.span)?;
        let value = self.eval_expr(expr, scope);
        self.depth -= 1;
        value
    }

    fn eval_expr(&mut self, expr: &'p Expr, scope: ScopeId) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Nil => Value::Nil,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Integer(n) => Value::Integer(*n),
                Literal::Float(x) => Value::Float(*x),
                Literal::Str(s) => Value::Str(s.clone()),
            }),
            ExprKind::Variable(name) => self.scopes.get(scope, name).cloned().ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::UndefinedName { name: name.clone() },
                    expr.span,
                )
            }),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                Self::unary(*op, value, expr.span)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                Self::binary(*op, left, right, expr.span)
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let decided = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                };
                if decided {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            ExprKind::Assign { name, value } => {
                let value = self.eval(value, scope)?;
                self.scopes.assign(scope, name, value.clone());
                Ok(value)
            }
            ExprKind::Call { callee, arguments } => {
                let callee = self.eval(callee, scope)?;
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.eval(argument, scope)?);
                }
                self.call(callee, values, expr.span)
            }
        }
    }

    fn call(
        &mut self,
        callee: Value,
        arguments: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(builtin) => {
                check_arity(builtin.name(), builtin.arity(), arguments.len(), span)?;
                call_builtin(builtin, &arguments, span)
            }
            Value::Function { id, name } => {
                let (function, defined_in) = self.closure(&id, span)?;
                let params = &function.params;
                check_arity(&name, params.len(), arguments.len(), span)?;

                if self.call_depth >= self.limits.max_call_depth {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::CallDepthExceeded {
                            limit: self.limits.max_call_depth,
                        },
                        span,
                    ));
                }
                debug!("calling {name} at depth {}", self.call_depth + 1);

                let scope = self.scopes.push(defined_in);
                for (param, argument) in params.iter().zip(arguments) {
                    self.scopes.declare(scope, param, argument);
                }

                self.call_depth += 1;
                let flow = self.execute_all(&function.body, scope);
                self.call_depth -= 1;
                self.end_activation(scope);

                match flow? {
                    Flow::Normal => Ok(Value::Nil),
                    Flow::Return(value) => Ok(value),
                    flow => Err(Self::misplaced(&flow, span)),
                }
            }
            other => Err(RuntimeError::new(
                RuntimeErrorKind::NotCallable {
                    type_name: other.type_name(),
                },
                span,
            )),
        }
    }

    /// Enter one level of evaluation, failing past [`Limits::max_depth`].
    fn descend(&mut self, span: Span) -> Result<(), RuntimeError> {
        if self.depth >= self.limits.max_depth {
            return Err(RuntimeError::new(
                RuntimeErrorKind::DepthExceeded {
                    limit: self.limits.max_depth,
                },
                span,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Register a closure over `scope` and hand out its first handle.
    fn define(&mut self, function: &'p Function, scope: ScopeId) -> FunctionId {
        let handle = Arc::new(());
        let closure = Closure {
            function,
            scope,
            handle: Arc::downgrade(&handle),
        };
        let index = if let Some(index) = self.free_functions.pop() {
            self.functions[index] = Some(closure);
            index
        } else {
            self.functions.push(Some(closure));
            self.functions.len() - 1
        };
        self.scopes.capture(scope);
        FunctionId { index, handle }
    }

    fn closure(
        &self,
        id: &FunctionId,
        span: Span,
    ) -> Result<(&'p Function, ScopeId), RuntimeError> {
        self.functions
            .get(id.index)
            .and_then(Option::as_ref)
            .map(|closure| (closure.function, closure.scope))
            .ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::NotCallable {
                        type_name: "function",
                    },
                    span,
                )
            })
    }

    fn end_activation(&mut self, scope: ScopeId) {
        self.scopes.release(scope);
        if self.scopes.should_collect() {
            self.collect_garbage();
        }
    }

    /// Free captured scopes no function value can reach any more,
    /// then the closures nothing names.
    ///
    /// A closure whose handle count exceeds the copies bound in scopes
    /// is also held by the evaluation in progress, so its scope is a
    /// root.
    fn collect_garbage(&mut self) {
        let mut bound = vec![0_usize; self.functions.len()];
        let ids = self.scopes.values().filter_map(|value| match value {
            Value::Function { id, .. } => Some(id.index),
            _ => None,
        });
        for index in ids {
            if let Some(count) = bound.get_mut(index) {
                *count += 1;
            }
        }
        let roots: Vec<ScopeId> = self
            .functions
            .iter()
            .zip(&bound)
            .filter_map(|(slot, &copies)| {
                let closure = slot.as_ref()?;
                (closure.handle.strong_count() > copies).then_some(closure.scope)
            })
            .collect();

        let functions = &self.functions;
        let freed = self.scopes.collect(&roots, |value| match value {
            Value::Function { id, .. } => functions
                .get(id.index)
                .and_then(Option::as_ref)
                .map(|closure| closure.scope),
            _ => None,
        });

        for (index, slot) in self.functions.iter_mut().enumerate() {
            if slot
                .as_ref()
                .is_some_and(|closure| closure.handle.strong_count() == 0)
            {
                *slot = None;
                self.free_functions.push(index);
            }
        }
        debug!(
            "collected {freed} scopes, {} still live",
            self.scopes.live()
        );
    }

    fn misplaced(flow: &Flow, span: Span) -> RuntimeError {
        let statement = match flow {
            Flow::Break => "break",
            Flow::Continue => "continue",
            Flow::Return(_) | Flow::Normal => "return",
        };
        RuntimeError::new(RuntimeErrorKind::InvalidControlFlow { statement }, span)
    }

    fn unary(op: UnaryOp, value: Value, span: Span) -> Result<Value, RuntimeError> {
        match (op, value) {
            (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
            (UnaryOp::Negate, Value::Integer(n)) => n
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::IntegerOverflow, span)),
            (UnaryOp::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
            (UnaryOp::Negate, other) => Err(type_error(op.symbol(), &other, None, span)),
        }
    }

    fn binary(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::Equal => Ok(Value::Bool(left.equals(&right))),
            BinaryOp::NotEqual => Ok(Value::Bool(!left.equals(&right))),
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let ordering = compare(&left, &right)
                    .ok_or_else(|| type_error(op.symbol(), &left, Some(&right), span))?;
                Ok(Value::Bool(ordering.is_some_and(|ordering| match op {
                    BinaryOp::Less => ordering == Ordering::Less,
                    BinaryOp::LessEqual => ordering != Ordering::Greater,
                    BinaryOp::Greater => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                })))
            }
            BinaryOp::Add => match (left, right) {
                (Value::Str(mut a), Value::Str(b)) => {
                    a.push_str(&b);
                    Ok(Value::Str(a))
                }
                (left, right) => arithmetic(op, &left, &right, span),
            },
            BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Remainder => {
                arithmetic(op, &left, &right, span)
            }
        }
    }
}

fn check_arity(name: &str, expected: usize, actual: usize, span: Span) -> Result<(), RuntimeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(RuntimeError::new(
            RuntimeErrorKind::Arity {
                name: name.to_string(),
                expected,
                actual,
            },
            span,
        ))
    }
}

fn call_builtin(builtin: Builtin, arguments: &[Value], span: Span) -> Result<Value, RuntimeError> {
    let argument = arguments.first().unwrap_or(&Value::Nil);
    match builtin {
        Builtin::Len => match argument {
            Value::Str(s) => Ok(Value::Integer(
                i64::try_from(s.chars().count()).unwrap_or(i64::MAX),
            )),
            other => Err(type_error(builtin.name(), other, None, span)),
        },
        Builtin::Str => Ok(Value::Str(argument.to_string())),
        Builtin::Type => Ok(Value::Str(argument.type_name().to_string())),
    }
}

fn type_error(operation: &str, left: &Value, right: Option<&Value>, span: Span) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::Type {
            operation: operation.to_string(),
            left: left.type_name(),
            right: right.map(Value::type_name),
        },
        span,
    )
}

/// Ordering of two comparable values; `None` when the types cannot be
/// ordered, `Some(None)` when they can but are unordered (NaN).
#[allow(clippy::cast_precision_loss, clippy::option_option)]
fn compare(left: &Value, right: &Value) -> Option<Option<Ordering>> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(Some(a.cmp(b))),
        (Value::Integer(a), Value::Float(b)) => Some((*a as f64).partial_cmp(b)),
        (Value::Float(a), Value::Integer(b)) => Some(a.partial_cmp(&(*b as f64))),
        (Value::Float(a), Value::Float(b)) => Some(a.partial_cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(Some(a.cmp(b))),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: Span,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(op, *a, *b, span),
        (Value::Integer(a), Value::Float(b)) => float_arithmetic(op, *a as f64, *b, span),
        (Value::Float(a), Value::Integer(b)) => float_arithmetic(op, *a, *b as f64, span),
        (Value::Float(a), Value::Float(b)) => float_arithmetic(op, *a, *b, span),
        _ => Err(type_error(op.symbol(), left, Some(right), span)),
    }
}

fn integer_arithmetic(op: BinaryOp, a: i64, b: i64, span: Span) -> Result<Value, RuntimeError> {
    if b == 0 && matches!(op, BinaryOp::Divide | BinaryOp::Remainder) {
        return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, span));
    }
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => a.checked_div(b),
        BinaryOp::Remainder => a.checked_rem(b),
        _ => unreachable!("{} is not arithmetic", op.symbol()),
    };
    result
        .map(Value::Integer)
        .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::IntegerOverflow, span))
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64, span: Span) -> Result<Value, RuntimeError> {
    if b == 0.0 && matches!(op, BinaryOp::Divide | BinaryOp::Remainder) {
        return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, span));
    }
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Remainder => a % b,
        _ => unreachable!("{} is not arithmetic", op.symbol()),
    };
    Ok(Value::Float(result))
}
