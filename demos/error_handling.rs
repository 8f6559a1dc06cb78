//! Demonstrate the errors reported for invalid scripts.

fn report(source: &str) {
    match yaj::parse_str(source) {
        Ok(_) => println!("Parsed OK"),
        Err(yaj::Error::Lex(e)) => {
            println!("Lex error: {e}");
            println!("  Kind: {:?}", e.kind);
            println!("  Location: line {}, column {}", e.span.line, e.span.column);
        }
        Err(yaj::Error::Parse(e)) => {
            println!("Parse error: {e}");
            println!("  Kind: {:?}", e.kind);
            println!("  Location: line {}, column {}", e.span.line, e.span.column);
        }
        Err(yaj::Error::Runtime(e)) => println!("Runtime error: {e}"),
    }
}

fn main() {
    // Unterminated string
    report("print(\"unclosed)\n");
    println!();

    // Missing closing brace
    report("while true {\n    print(1)\n");
    println!();

    // Parses fine, fails while running; earlier output survives.
    let (output, error) = yaj::run("print(\"start\")\nfn add(a, b) { return a + b }\nprint(add(1, 2, 3))");
    println!("Output before failure: {output}");
    if let Some(e) = error {
        println!("Runtime error: {e}");
        println!("  Location: {}", e.span());
    }
}
