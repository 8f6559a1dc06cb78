//! Pretty-printer that serializes a program AST back into canonical source.
//!
//! Produces four-space-indented output with one statement per line and
//! only the parentheses that precedence requires.

use std::fmt::Write as _;

use crate::ast::{Expr, ExprKind, Precedence, Program, Stmt, StmtKind};

const INDENT: &str = "    ";

/// Format a `Program` AST into source text.
///
/// Tokenizing and parsing the result yields a tree of the same
/// shape. An empty program formats to an empty string; anything
/// else ends with a newline.
#[must_use]
pub fn format(program: &Program) -> String {
    let mut out = String::new();
    for stmt in &program.statements {
        format_statement(&mut out, stmt, 0);
    }
    out
}

/// Format a single expression as source text.
#[must_use]
pub fn format_expression(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn format_statement(out: &mut String, stmt: &Stmt, indent: usize) {
    out.push_str(&INDENT.repeat(indent));
    write_statement(out, stmt, indent);
    out.push('\n');
}

fn write_statement(out: &mut String, stmt: &Stmt, indent: usize) {
    match &stmt.kind {
        StmtKind::Expr(expr) => write_expr(out, expr),
        StmtKind::Let { name, value } => {
            out.push_str("let ");
            out.push_str(name);
            if let Some(value) = value {
                out.push_str(" = ");
                write_expr(out, value);
            }
        }
        StmtKind::Print(arguments) => {
            out.push_str("print");
            write_arguments(out, arguments);
        }
        StmtKind::Block(statements) => write_block(out, statements, indent),
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.push_str("if ");
            write_expr(out, condition);
            out.push(' ');
            write_block(out, then_branch, indent);

            if let Some(branch) = else_branch {
                out.push_str(" else ");
                match &branch.kind {
                    StmtKind::If { .. } => write_statement(out, branch, indent),
                    StmtKind::Block(statements) => write_block(out, statements, indent),
                    _ => write_block(out, std::slice::from_ref(branch.as_ref()), indent),
                }
            }
        }
        StmtKind::While { condition, body } => {
            out.push_str("while ");
            write_expr(out, condition);
            out.push(' ');
            write_block(out, body, indent);
        }
        StmtKind::Function(function) => {
            let _ = write!(out, "fn {}({}) ", function.name, function.params.join(", "));
            write_block(out, &function.body, indent);
        }
        StmtKind::Return(value) => {
            out.push_str("return");
            if let Some(value) = value {
                out.push(' ');
                write_expr(out, value);
            }
        }
        StmtKind::Break => out.push_str("break"),
        StmtKind::Continue => out.push_str("continue"),
    }
}

/// Write `{`, the statements one level deeper, and the closing `}`
/// at the current indentation (without a trailing newline).
fn write_block(out: &mut String, statements: &[Stmt], indent: usize) {
    out.push_str("{\n");
    for stmt in statements {
        format_statement(out, stmt, indent + 1);
    }
    out.push_str(&INDENT.repeat(indent));
    out.push('}');
}

fn write_arguments(out: &mut String, arguments: &[Expr]) {
    out.push('(');
    for (i, argument) in arguments.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, argument);
    }
    out.push(')');
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(literal) => {
            let _ = write!(out, "{literal}");
        }
        ExprKind::Variable(name) => out.push_str(name),
        ExprKind::Unary { op, operand } => {
            out.push_str(op.symbol());
            write_operand(out, operand, operand.precedence() < Precedence::Unary);
        }
        ExprKind::Binary { op, left, right } => {
            write_infix(out, op.symbol(), op.precedence(), left, right);
        }
        ExprKind::Logical { op, left, right } => {
            write_infix(out, op.symbol(), op.precedence(), left, right);
        }
        ExprKind::Assign { name, value } => {
            out.push_str(name);
            out.push_str(" = ");
            write_expr(out, value);
        }
        ExprKind::Call { callee, arguments } => {
            write_operand(out, callee, callee.precedence() < Precedence::Call);
            write_arguments(out, arguments);
        }
    }
}

/// Left-associative infix operator: a right operand at the same level
/// needs parentheses to keep its grouping.
fn write_infix(out: &mut String, symbol: &str, level: Precedence, left: &Expr, right: &Expr) {
    write_operand(out, left, left.precedence() < level);
    out.push(' ');
    out.push_str(symbol);
    out.push(' ');
    write_operand(out, right, right.precedence() <= level);
}

fn write_operand(out: &mut String, expr: &Expr, parenthesize: bool) {
    if parenthesize {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}
