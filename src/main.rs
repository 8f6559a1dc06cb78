//! CLI tool to inspect, format, and run yaj scripts.

use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        eprintln!("Usage: yaj <command> [files...]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  tokens  Print one token per line");
        eprintln!("  tree    Print the syntax tree");
        eprintln!("  fmt     Format script(s) and print to stdout");
        eprintln!("  check   Check if script(s) are formatted");
        eprintln!("  run     Run script(s) and print their output");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  yaj run hello.yaj");
        eprintln!("  yaj fmt hello.yaj");
        eprintln!("  yaj tree hello.yaj");
        return ExitCode::from(2);
    }

    let command = args[1].as_str();
    let files = &args[2..];

    if files.is_empty() {
        eprintln!("Error: no files specified");
        return ExitCode::from(2);
    }

    let mut had_error = false;

    for path in files {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{path}: {e}");
                had_error = true;
                continue;
            }
        };

        match command {
            "tokens" => match yaj::tokenize(&content) {
                Ok(tokens) => {
                    for token in &tokens {
                        println!("{token}");
                    }
                }
                Err(e) => {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            },
            "tree" => match yaj::parse_str(&content) {
                Ok(program) => println!("{program}"),
                Err(e) => {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            },
            "fmt" => match yaj::parse_str(&content) {
                Ok(program) => {
                    print!("{}", yaj::format(&program));
                }
                Err(e) => {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            },
            "check" => match yaj::parse_str(&content) {
                Ok(program) => {
                    let formatted = yaj::format(&program);
                    if formatted == content {
                        eprintln!("{path}: formatted");
                    } else {
                        eprintln!("{path}: not formatted");
                        had_error = true;
                    }
                }
                Err(e) => {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            },
            "run" => {
                let (output, error) = yaj::run(&content);
                if !output.is_empty() {
                    println!("{output}");
                }
                if let Some(e) = error {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            }
            _ => {
                eprintln!("Unknown command: {command}");
                return ExitCode::from(2);
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
