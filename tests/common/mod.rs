#![allow(dead_code)]

use std::ops::Range;

use pretty_assertions::assert_eq;
use yaj::{
    Error, Expr, ExprKind, Program, Session, Stmt, StmtKind, format, parse, parse_str, render,
    tokenize,
};

pub fn roundtrip(input: &str) {
    let tokens = tokenize(input).expect("tokenize failed");
    let program = parse(&tokens).expect("parse failed");
    let output = format(&program);
    assert_eq!(
        output, input,
        "round-trip mismatch:\n--- expected ---\n{input}\n--- got ---\n{output}"
    );
}

/// Helper: format an AST, parse it back, assert the trees have the same shape.
pub fn assert_ast_roundtrip(original: &Program) {
    let formatted = format(original);
    let parsed = parse_str(&formatted).unwrap_or_else(|e| {
        panic!(
            "failed to re-parse formatted output: {e}\n\
             --- formatted ---\n{formatted}"
        )
    });

    assert_eq!(
        render(original),
        render(&parsed),
        "tree mismatch\n--- formatted ---\n{formatted}"
    );
}

/// Run `source` and return its combined output, panicking on failure.
pub fn output_of(source: &str) -> String {
    let mut session = Session::new(source);
    if let Err(e) = session.run() {
        panic!("run failed: {e}\n--- source ---\n{source}");
    }
    session.combined_output()
}

/// Run `source`, expecting it to fail; returns the output printed
/// before the failure and the error.
pub fn failure_of(source: &str) -> (String, Error) {
    let mut session = Session::new(source);
    match session.run() {
        Ok(()) => panic!(
            "run succeeded with output {:?}\n--- source ---\n{source}",
            session.combined_output()
        ),
        Err(e) => (session.combined_output(), e),
    }
}

/// Assert that every node's token range lies inside its parent's and
/// that siblings are ordered and disjoint.
pub fn assert_ranges_nest(program: &Program) {
    let mut previous_end = 0;
    for stmt in &program.statements {
        check_stmt(stmt, &(0..usize::MAX), &mut previous_end);
    }
}

fn contains(parent: &Range<usize>, child: &Range<usize>) -> bool {
    parent.start <= child.start && child.end <= parent.end && child.start < child.end
}

fn check_sibling(range: &Range<usize>, parent: &Range<usize>, previous_end: &mut usize) {
    assert!(
        contains(parent, range),
        "range {range:?} escapes parent {parent:?}"
    );
    assert!(
        *previous_end <= range.start,
        "range {range:?} overlaps previous sibling ending at {previous_end}"
    );
    *previous_end = range.end;
}

fn check_stmts(statements: &[Stmt], parent: &Range<usize>) {
    let mut previous_end = parent.start;
    for stmt in statements {
        check_stmt(stmt, parent, &mut previous_end);
    }
}

fn check_stmt(stmt: &Stmt, parent: &Range<usize>, previous_end: &mut usize) {
    check_sibling(&stmt.tokens, parent, previous_end);
    let own = &stmt.tokens;
    let mut cursor = own.start;
    match &stmt.kind {
        StmtKind::Expr(expr) => check_expr(expr, own, &mut cursor),
        StmtKind::Let { value, .. } | StmtKind::Return(value) => {
            if let Some(value) = value {
                check_expr(value, own, &mut cursor);
            }
        }
        StmtKind::Print(arguments) => {
            for argument in arguments {
                check_expr(argument, own, &mut cursor);
            }
        }
        StmtKind::Block(statements) => check_stmts(statements, own),
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            check_expr(condition, own, &mut cursor);
            for branch in then_branch {
                check_stmt(branch, own, &mut cursor);
            }
            if let Some(branch) = else_branch {
                check_stmt(branch, own, &mut cursor);
            }
        }
        StmtKind::While { condition, body } => {
            check_expr(condition, own, &mut cursor);
            for stmt in body {
                check_stmt(stmt, own, &mut cursor);
            }
        }
        StmtKind::Function(function) => check_stmts(&function.body, own),
        StmtKind::Break | StmtKind::Continue => {}
    }
}

fn check_expr(expr: &Expr, parent: &Range<usize>, previous_end: &mut usize) {
    check_sibling(&expr.tokens, parent, previous_end);
    let own = &expr.tokens;
    let mut cursor = own.start;
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Variable(_) => {
            assert_eq!(own.len(), 1, "leaf spans more than one token");
        }
        ExprKind::Unary { operand, .. } => check_expr(operand, own, &mut cursor),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            check_expr(left, own, &mut cursor);
            check_expr(right, own, &mut cursor);
        }
        ExprKind::Assign { value, .. } => check_expr(value, own, &mut cursor),
        ExprKind::Call { callee, arguments } => {
            check_expr(callee, own, &mut cursor);
            for argument in arguments {
                check_expr(argument, own, &mut cursor);
            }
        }
    }
}
