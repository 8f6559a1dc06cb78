//! Round-trip tests: parse then format should produce the same output.

mod common;

use common::{assert_ast_roundtrip, roundtrip};
use yaj::{BinaryOp, Expr, LogicalOp, Program, Stmt, UnaryOp, format, parse_str};

// -----------------------------------------------------------
// Canonical source survives parse + format unchanged.
// -----------------------------------------------------------

#[test]
fn roundtrip_print() {
    roundtrip("print(1 + 2 * 3)\n");
}

#[test]
fn roundtrip_let_and_assignment() {
    roundtrip("let x\nlet y = 2\nx = y = 3\n");
}

#[test]
fn roundtrip_grouping() {
    roundtrip("print((1 + 2) * 3, 1 - (2 - 3), -(1 + 2))\n");
}

#[test]
fn roundtrip_logical() {
    roundtrip("print(a || b && c, (a || b) && c, !(a == b))\n");
}

#[test]
fn roundtrip_function() {
    roundtrip("fn add(a, b) {\n    return a + b\n}\nprint(add(1, 2))\n");
}

#[test]
fn roundtrip_empty_function() {
    roundtrip("fn noop() {\n}\n");
}

#[test]
fn roundtrip_if_else_chain() {
    roundtrip(
        "if x < 1 {\n    print(\"small\")\n} else if x < 10 {\n    print(\"medium\")\n} else {\n    print(\"large\")\n}\n",
    );
}

#[test]
fn roundtrip_while_with_control_flow() {
    roundtrip(
        "while true {\n    if done {\n        break\n    }\n    if skip {\n        continue\n    }\n}\n",
    );
}

#[test]
fn roundtrip_nested_blocks() {
    roundtrip("{\n    let a = 1\n    {\n        let b = a\n    }\n}\n");
}

#[test]
fn roundtrip_literals() {
    roundtrip("print(nil, true, false, 42, 2.5, 3.0, \"tab\\tquote\\\"\")\n");
}

#[test]
fn roundtrip_bare_return() {
    roundtrip("fn f() {\n    return\n}\n");
}

#[test]
fn roundtrip_call_chain() {
    roundtrip("make()(1)(2, 3)\n");
}

// -----------------------------------------------------------
// Non-canonical input normalises to canonical output.
// -----------------------------------------------------------

fn normalises(input: &str, expected: &str) {
    let program = parse_str(input).expect("parse failed");
    assert_eq!(format(&program), expected);
}

#[test]
fn redundant_parentheses_are_dropped() {
    normalises("print(((1)) + (2 * 3))", "print(1 + 2 * 3)\n");
}

#[test]
fn semicolons_become_newlines() {
    normalises("let a = 1; let b = 2;", "let a = 1\nlet b = 2\n");
}

#[test]
fn comments_and_blank_lines_are_dropped() {
    normalises("// header\n\n\nprint(1) // trailing\n\n", "print(1)\n");
}

#[test]
fn else_on_next_line_is_joined() {
    normalises(
        "if a { print(1) }\nelse { print(2) }",
        "if a {\n    print(1)\n} else {\n    print(2)\n}\n",
    );
}

#[test]
fn operands_may_continue_on_the_next_line() {
    normalises("let total = 1 +\n    2 +\n    3", "let total = 1 + 2 + 3\n");
}

#[test]
fn crlf_line_endings() {
    normalises("let a = 1\r\nprint(a)\r\n", "let a = 1\nprint(a)\n");
}

// -----------------------------------------------------------
// Built trees survive format + parse with the same shape.
// -----------------------------------------------------------

#[test]
fn built_tree_with_right_nested_subtraction() {
    let program = Program::new().statement(Stmt::print(vec![Expr::binary(
        BinaryOp::Subtract,
        Expr::int(10),
        Expr::binary(BinaryOp::Subtract, Expr::int(4), Expr::int(3)),
    )]));
    assert_ast_roundtrip(&program);
}

#[test]
fn built_tree_with_assignment_inside_operator() {
    let program = Program::new().statement(Stmt::expr(Expr::binary(
        BinaryOp::Multiply,
        Expr::assign("x", Expr::int(2)),
        Expr::unary(UnaryOp::Negate, Expr::var("y")),
    )));
    assert_ast_roundtrip(&program);
}

#[test]
fn built_tree_with_control_flow() {
    let program = Program::new()
        .statement(Stmt::function(
            "loop_until",
            &["limit"],
            vec![
                Stmt::declare("i", Expr::int(0)),
                Stmt::repeat(
                    Expr::logical(
                        LogicalOp::Or,
                        Expr::bool(true),
                        Expr::binary(BinaryOp::Less, Expr::var("i"), Expr::var("limit")),
                    ),
                    vec![
                        Stmt::when(
                            Expr::binary(BinaryOp::Equal, Expr::var("i"), Expr::var("limit")),
                            vec![Stmt::ret(Some(Expr::var("i")))],
                        )
                        .otherwise(Stmt::expr(Expr::assign(
                            "i",
                            Expr::binary(BinaryOp::Add, Expr::var("i"), Expr::int(1)),
                        ))),
                    ],
                ),
            ],
        ))
        .statement(Stmt::print(vec![Expr::call_named(
            "loop_until",
            vec![Expr::int(3)],
        )]));
    assert_ast_roundtrip(&program);
}
