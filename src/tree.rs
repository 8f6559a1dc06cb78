//! S-expression rendering of a program AST for inspection.
//!
//! Every node with children opens a line and its children follow one
//! level deeper; positions are left out so that two trees render the
//! same exactly when they have the same shape.

use std::fmt;

use crate::ast::{Expr, ExprKind, Literal, Program, Stmt, StmtKind};

/// Render a program as an indented S-expression.
#[must_use]
pub fn render(program: &Program) -> String {
    let mut writer = TreeWriter::default();
    writer.open("program");
    for stmt in &program.statements {
        writer.statement(stmt);
    }
    writer.close();
    writer.out
}

/// Render a single expression as an indented S-expression.
#[must_use]
pub fn render_expression(expr: &Expr) -> String {
    let mut writer = TreeWriter::default();
    writer.expression(expr);
    writer.out
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

#[derive(Default)]
struct TreeWriter {
    out: String,
    depth: usize,
}

impl TreeWriter {
    fn line(&mut self) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str(&"  ".repeat(self.depth));
    }

    fn open(&mut self, head: &str) {
        self.line();
        self.out.push('(');
        self.out.push_str(head);
        self.depth += 1;
    }

    fn close(&mut self) {
        self.out.push(')');
        self.depth -= 1;
    }

    fn leaf(&mut self, text: &str) {
        self.line();
        self.out.push('(');
        self.out.push_str(text);
        self.out.push(')');
    }

    fn group(&mut self, head: &str, statements: &[Stmt]) {
        self.open(head);
        for stmt in statements {
            self.statement(stmt);
        }
        self.close();
    }

    fn statement(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.expression(expr),
            StmtKind::Let { name, value } => match value {
                Some(value) => {
                    self.open(&format!("let {name}"));
                    self.expression(value);
                    self.close();
                }
                None => self.leaf(&format!("let {name}")),
            },
            StmtKind::Print(arguments) => {
                self.open("print");
                for argument in arguments {
                    self.expression(argument);
                }
                self.close();
            }
            StmtKind::Block(statements) => self.group("block", statements),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.open("if");
                self.expression(condition);
                self.group("then", then_branch);
                if let Some(branch) = else_branch {
                    self.open("else");
                    self.statement(branch);
                    self.close();
                }
                self.close();
            }
            StmtKind::While { condition, body } => {
                self.open("while");
                self.expression(condition);
                self.group("body", body);
                self.close();
            }
            StmtKind::Function(function) => {
                self.open(&format!("fn {}", function.name));
                let mut params = String::from("params");
                for param in &function.params {
                    params.push(' ');
                    params.push_str(param);
                }
                self.leaf(&params);
                self.group("body", &function.body);
                self.close();
            }
            StmtKind::Return(value) => match value {
                Some(value) => {
                    self.open("return");
                    self.expression(value);
                    self.close();
                }
                None => self.leaf("return"),
            },
            StmtKind::Break => self.leaf("break"),
            StmtKind::Continue => self.leaf("continue"),
        }
    }

    fn expression(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(literal) => {
                let text = match literal {
                    Literal::Nil => "nil".to_string(),
                    Literal::Bool(b) => format!("bool {b}"),
                    Literal::Integer(n) => format!("int {n}"),
                    Literal::Float(_) => format!("float {literal}"),
                    Literal::Str(_) => format!("string {literal}"),
                };
                self.leaf(&text);
            }
            ExprKind::Variable(name) => self.leaf(&format!("var {name}")),
            ExprKind::Unary { op, operand } => {
                self.open(&format!("unary {}", op.symbol()));
                self.expression(operand);
                self.close();
            }
            ExprKind::Binary { op, left, right } => {
                self.open(&format!("binary {}", op.symbol()));
                self.expression(left);
                self.expression(right);
                self.close();
            }
            ExprKind::Logical { op, left, right } => {
                self.open(&format!("logical {}", op.symbol()));
                self.expression(left);
                self.expression(right);
                self.close();
            }
            ExprKind::Assign { name, value } => {
                self.open(&format!("assign {name}"));
                self.expression(value);
                self.close();
            }
            ExprKind::Call { callee, arguments } => {
                self.open("call");
                self.expression(callee);
                self.open("args");
                for argument in arguments {
                    self.expression(argument);
                }
                self.close();
                self.close();
            }
        }
    }
}
