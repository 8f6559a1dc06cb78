//! End-to-end tests: source text in, combined output and errors out.

mod common;

use common::{failure_of, output_of};
use yaj::{Error, Limits, RuntimeErrorKind, Session, SessionFactory};

fn runtime_kind(error: Error) -> RuntimeErrorKind {
    match error {
        Error::Runtime(e) => e.kind,
        other => panic!("expected a runtime error, got {other}"),
    }
}

// -----------------------------------------------------------
// Reference scenarios.
// -----------------------------------------------------------

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(output_of("print(1 + 2 * 3)"), "7");
}

#[test]
fn division_by_zero_leaves_output_empty() {
    let (output, error) = failure_of("x = 5\nprint(x / 0)");
    assert_eq!(output, "");
    assert_eq!(runtime_kind(error), RuntimeErrorKind::DivisionByZero);
}

#[test]
fn too_many_arguments() {
    let (_, error) = failure_of("fn add(a, b) {\n    return a + b\n}\nadd(1, 2, 3)");
    assert_eq!(
        runtime_kind(error),
        RuntimeErrorKind::Arity {
            name: "add".to_string(),
            expected: 2,
            actual: 3,
        }
    );
}

#[test]
fn undeclared_identifier() {
    let (_, error) = failure_of("print(y)");
    assert_eq!(
        runtime_kind(error),
        RuntimeErrorKind::UndefinedName {
            name: "y".to_string()
        }
    );
}

#[test]
fn loop_with_false_condition_never_runs() {
    assert_eq!(output_of("while false {\n    print(\"never\")\n}"), "");
    assert_eq!(
        output_of("print(\"a\")\nwhile 1 > 2 {\n    print(\"never\")\n}\nprint(\"b\")"),
        "a\nb"
    );
}

// -----------------------------------------------------------
// Functions and closures.
// -----------------------------------------------------------

#[test]
fn recursion() {
    let source = "\
fn fib(n) {
    if n < 2 { return n }
    return fib(n - 1) + fib(n - 2)
}
print(fib(10))
print(fib(15))
";
    assert_eq!(output_of(source), "55\n610");
}

#[test]
fn closures_see_later_updates() {
    let source = "\
let count = 0
fn show() {
    return count
}
count = 5
print(show())
";
    assert_eq!(output_of(source), "5");
}

#[test]
fn closure_keeps_its_defining_call_alive() {
    let source = "\
fn counter() {
    let n = 0
    fn next() {
        n = n + 1
        return n
    }
    return next
}
let c = counter()
let d = counter()
c()
c()
print(c(), d())
";
    assert_eq!(output_of(source), "3 1");
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(output_of("fn f() {}\nprint(f())"), "nil");
}

#[test]
fn return_from_inside_a_loop() {
    let source = "\
fn find() {
    let i = 0
    while true {
        if i == 4 { return i }
        i = i + 1
    }
}
print(find())
";
    assert_eq!(output_of(source), "4");
}

#[test]
fn calling_a_non_function() {
    let (_, error) = failure_of("let x = 1\nx()");
    assert_eq!(
        runtime_kind(error),
        RuntimeErrorKind::NotCallable { type_name: "int" }
    );
}

#[test]
fn runaway_recursion_hits_the_call_limit() {
    let factory = SessionFactory::with_limits(Limits::new().with_max_call_depth(10));
    let mut session = factory.create_session("fn f(n) {\n    return f(n + 1)\n}\nf(0)");
    let error = session.run().unwrap_err();
    assert_eq!(
        runtime_kind(error),
        RuntimeErrorKind::CallDepthExceeded { limit: 10 }
    );
}

#[test]
fn deep_expressions_inside_recursion_fail_cleanly() {
    let program = |depth: usize| {
        let nested = format!("{}f(n - 1){}", "(1 + ".repeat(90), ")".repeat(90));
        format!("fn f(n) {{\n    if n < 1 {{ return 0 }}\n    return {nested}\n}}\nprint(f({depth}))")
    };
    let (shallow, deep) = (program(5), program(190));

    let (output, error) = std::thread::Builder::new()
        .stack_size(8 << 20)
        .spawn(move || {
            assert_eq!(output_of(&shallow), "450");
            failure_of(&deep)
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(output, "");
    assert_eq!(
        runtime_kind(error),
        RuntimeErrorKind::DepthExceeded {
            limit: Limits::default().max_depth
        }
    );
}

// -----------------------------------------------------------
// Scoping.
// -----------------------------------------------------------

#[test]
fn closures_outlive_discarded_helpers() {
    let source = "\
fn counter() {
    let n = 0
    fn next() {
        n = n + 1
        return n
    }
    return next
}
fn noise(k) {
    fn helper() { return k }
    return helper()
}
let tick = counter()
let i = 0
while i < 2000 {
    noise(i)
    tick()
    i = i + 1
}
print(tick(), counter()())
";
    assert_eq!(output_of(source), "2001 1");
}

#[test]
fn block_bindings_do_not_escape() {
    let (_, error) = failure_of("{\n    let inner = 1\n}\nprint(inner)");
    assert_eq!(
        runtime_kind(error),
        RuntimeErrorKind::UndefinedName {
            name: "inner".to_string()
        }
    );
}

#[test]
fn function_locals_do_not_escape() {
    let (_, error) = failure_of("fn f() {\n    let local = 1\n}\nf()\nprint(local)");
    assert!(matches!(
        runtime_kind(error),
        RuntimeErrorKind::UndefinedName { name } if name == "local"
    ));
}

#[test]
fn assignment_updates_nearest_declaration() {
    assert_eq!(output_of("let x = 1\n{\n    x = 2\n}\nprint(x)"), "2");
}

#[test]
fn let_shadows_in_inner_scope() {
    let source = "\
let x = 1
{
    let x = 2
    print(x)
}
print(x)
";
    assert_eq!(output_of(source), "2\n1");
}

#[test]
fn loop_bodies_get_a_fresh_scope_each_iteration() {
    let source = "\
let i = 0
let first = nil
while i < 3 {
    let j = i
    fn get() {
        return j
    }
    if i == 0 { first = get }
    i = i + 1
}
print(first())
";
    assert_eq!(output_of(source), "0");
}

// -----------------------------------------------------------
// Control flow and values.
// -----------------------------------------------------------

#[test]
fn break_and_continue() {
    let source = "\
let i = 0
while true {
    i = i + 1
    if i % 2 == 0 { continue }
    if i > 7 { break }
    print(i)
}
";
    assert_eq!(output_of(source), "1\n3\n5\n7");
}

#[test]
fn else_if_chain() {
    let source = "\
fn grade(n) {
    if n >= 90 {
        return \"a\"
    } else if n >= 80 {
        return \"b\"
    } else {
        return \"c\"
    }
}
print(grade(95), grade(85), grade(10))
";
    assert_eq!(output_of(source), "a b c");
}

#[test]
fn logical_operators_return_operands() {
    assert_eq!(output_of("print(nil || \"default\")"), "default");
    assert_eq!(output_of("print(0 && 1)"), "0");
    assert_eq!(output_of("print(!\"\")"), "true");
}

#[test]
fn short_circuit_skips_the_right_side() {
    assert_eq!(output_of("print(false && undefined_name)"), "false");
    assert_eq!(output_of("print(true || undefined_name)"), "true");
}

#[test]
fn numbers() {
    assert_eq!(output_of("print(7 / 2, -7 / 2, 7 % 3)"), "3 -3 1");
    assert_eq!(output_of("print(7.0 / 2, 1 + 1.0)"), "3.5 2.0");
    assert_eq!(output_of("print(1 == 1.0, 2 < 2.5)"), "true true");
}

#[test]
fn float_division_by_zero_is_an_error() {
    let (_, error) = failure_of("print(1.5 / 0)");
    assert_eq!(runtime_kind(error), RuntimeErrorKind::DivisionByZero);
}

#[test]
fn integer_overflow_is_an_error() {
    let (_, error) = failure_of("print(9223372036854775807 + 1)");
    assert_eq!(runtime_kind(error), RuntimeErrorKind::IntegerOverflow);
}

#[test]
fn builtins() {
    assert_eq!(output_of("print(len(\"héllo\"))"), "5");
    assert_eq!(output_of("print(str(2.0) + \"!\")"), "2.0!");
    assert_eq!(
        output_of("fn f() {}\nprint(type(1), type(1.5), type(\"\"), type(nil), type(f), type(len))"),
        "int float string nil function builtin"
    );
}

#[test]
fn type_errors_name_both_operands() {
    let (_, error) = failure_of("print(\"a\" - 1)");
    assert_eq!(
        runtime_kind(error),
        RuntimeErrorKind::Type {
            operation: "-".to_string(),
            left: "string",
            right: Some("int"),
        }
    );
}

// -----------------------------------------------------------
// Sessions and stage separation.
// -----------------------------------------------------------

#[test]
fn output_before_a_runtime_error_is_kept() {
    let (output, error) = failure_of("print(1)\nprint(2)\nprint(nil + 1)");
    assert_eq!(output, "1\n2");
    assert!(matches!(
        runtime_kind(error),
        RuntimeErrorKind::Type { left: "nil", .. }
    ));
}

#[test]
fn lex_errors_stop_before_anything_runs() {
    let (output, error) = yaj::run("print(1)\n@");
    assert_eq!(output, "");
    assert!(matches!(error, Some(Error::Lex(_))));
}

#[test]
fn parse_errors_stop_before_anything_runs() {
    let (output, error) = yaj::run("print(1)\nprint(");
    assert_eq!(output, "");
    assert!(matches!(error, Some(Error::Parse(_))));
}

#[test]
fn independent_sessions_agree() {
    let source = "let s = \"\"\nlet i = 0\nwhile i < 5 {\n    s = s + str(i)\n    i = i + 1\n}\nprint(s)";
    let factory = SessionFactory::new();
    let mut first = factory.create_session(source);
    let mut second = factory.create_session(source);
    first.run().unwrap();
    second.run().unwrap();
    assert_eq!(first.combined_output(), "01234");
    assert_eq!(first.combined_output(), second.combined_output());
}

#[test]
fn error_log_accumulates_across_runs() {
    let mut session = Session::new("print(missing)");
    assert!(session.run().is_err());
    assert!(session.run().is_err());
    assert_eq!(session.errors().len(), 2);
    assert_eq!(session.errors()[0], session.errors()[1]);
}

#[test]
fn error_display_includes_position() {
    let (_, error) = failure_of("let a = 1\nprint(a / 0)");
    assert_eq!(error.to_string(), "division by zero at line 2, column 9");
    assert_eq!(error.span().line, 2);
}
