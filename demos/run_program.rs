//! Run a script, then inspect its tree and canonical formatting.

use yaj::{Limits, Session, SessionFactory};

fn main() {
    let input = "\
fn fib(n) {
    if n < 2 { return n }
    return fib(n - 1) + fib(n - 2)
}
let i = 0
while i < 8 {
    print(\"fib(\" + str(i) + \") = \" + str(fib(i)))
    i = i + 1
}
";

    let mut session = Session::new(input);
    session.run().expect("run failed");
    println!("Output:\n{}", session.combined_output());

    if let Some(program) = session.program() {
        println!("\nStatements: {}", program.statements.len());
        println!("\nFormatted:\n{}", yaj::format(program));
    }

    // Sessions from one factory share only their limits.
    let factory = SessionFactory::with_limits(Limits::new().with_max_call_depth(50));
    let mut deep = factory.create_session("fn down(n) { return down(n + 1) }\ndown(0)");
    if let Err(e) = deep.run() {
        println!("Stopped: {e}");
    }
}
