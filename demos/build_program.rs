//! Build a program with the builder API, format it, and run the result.

use yaj::{BinaryOp, Expr, Program, Stmt};

fn main() {
    let program = Program::new()
        .statement(Stmt::function(
            "square",
            &["n"],
            vec![Stmt::ret(Some(Expr::binary(
                BinaryOp::Multiply,
                Expr::var("n"),
                Expr::var("n"),
            )))],
        ))
        .statement(Stmt::declare("total", Expr::int(0)))
        .statement(Stmt::declare("i", Expr::int(1)))
        .statement(Stmt::repeat(
            Expr::binary(BinaryOp::LessEqual, Expr::var("i"), Expr::int(4)),
            vec![
                Stmt::expr(Expr::assign(
                    "total",
                    Expr::binary(
                        BinaryOp::Add,
                        Expr::var("total"),
                        Expr::call_named("square", vec![Expr::var("i")]),
                    ),
                )),
                Stmt::expr(Expr::assign(
                    "i",
                    Expr::binary(BinaryOp::Add, Expr::var("i"), Expr::int(1)),
                )),
            ],
        ))
        .statement(
            Stmt::when(
                Expr::binary(BinaryOp::Greater, Expr::var("total"), Expr::int(20)),
                vec![Stmt::print(vec![Expr::string("big"), Expr::var("total")])],
            )
            .otherwise(Stmt::print(vec![Expr::string("small")])),
        );

    let source = yaj::format(&program);
    println!("{source}");

    let (output, error) = yaj::run(&source);
    println!("Output: {output}");
    if let Some(e) = error {
        println!("Error: {e}");
    }
}
