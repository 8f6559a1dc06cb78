//! Formatter-specific tests.

use yaj::{BinaryOp, Expr, LogicalOp, Program, Stmt, UnaryOp, format, format_expression};

#[test]
fn format_trailing_newline() {
    let program = Program::new().statement(Stmt::expr(Expr::var("x")));
    assert!(format(&program).ends_with('\n'));
}

#[test]
fn format_four_space_indentation() {
    let program = Program::new().statement(Stmt::repeat(
        Expr::bool(true),
        vec![Stmt::when(Expr::var("done"), vec![Stmt::synthetic(yaj::StmtKind::Break)])],
    ));
    let output = format(&program);
    assert!(output.contains("\n    if done {\n"));
    assert!(output.contains("\n        break\n"));
    assert!(output.contains("\n    }\n}"));
}

#[test]
fn format_escapes_strings() {
    let expr = Expr::string("say \"hi\"\\\n");
    assert_eq!(format_expression(&expr), r#""say \"hi\"\\\n""#);
}

#[test]
fn format_floats_keep_a_fraction() {
    assert_eq!(format_expression(&Expr::float(3.0)), "3.0");
    assert_eq!(format_expression(&Expr::float(0.125)), "0.125");
}

#[test]
fn format_unary_operands() {
    let negated_sum = Expr::unary(
        UnaryOp::Negate,
        Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::var("b")),
    );
    assert_eq!(format_expression(&negated_sum), "-(a + b)");

    let double_not = Expr::unary(UnaryOp::Not, Expr::unary(UnaryOp::Not, Expr::var("a")));
    assert_eq!(format_expression(&double_not), "!!a");
}

#[test]
fn format_logical_grouping() {
    let or_inside_and = Expr::logical(
        LogicalOp::And,
        Expr::logical(LogicalOp::Or, Expr::var("a"), Expr::var("b")),
        Expr::var("c"),
    );
    assert_eq!(format_expression(&or_inside_and), "(a || b) && c");

    let and_inside_or = Expr::logical(
        LogicalOp::Or,
        Expr::var("a"),
        Expr::logical(LogicalOp::And, Expr::var("b"), Expr::var("c")),
    );
    assert_eq!(format_expression(&and_inside_or), "a || b && c");
}

#[test]
fn format_assignment_as_operand() {
    let expr = Expr::binary(
        BinaryOp::Add,
        Expr::assign("x", Expr::int(1)),
        Expr::int(2),
    );
    assert_eq!(format_expression(&expr), "(x = 1) + 2");
}

#[test]
fn format_call_on_expression() {
    let expr = Expr::call(
        Expr::logical(LogicalOp::Or, Expr::var("f"), Expr::var("g")),
        vec![Expr::int(1)],
    );
    assert_eq!(format_expression(&expr), "(f || g)(1)");
}

#[test]
fn format_function_with_params() {
    let program = Program::new().statement(Stmt::function(
        "pick",
        &["a", "b"],
        vec![Stmt::ret(Some(Expr::var("a")))],
    ));
    assert_eq!(format(&program), "fn pick(a, b) {\n    return a\n}\n");
}

#[test]
fn format_else_wraps_single_statement() {
    let program = Program::new().statement(
        Stmt::when(Expr::var("a"), vec![]).otherwise(Stmt::print(vec![Expr::int(1)])),
    );
    assert_eq!(format(&program), "if a {\n} else {\n    print(1)\n}\n");
}
