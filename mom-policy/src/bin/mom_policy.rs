// Policy evaluator command line
// Evaluates a policy from a file, a string or stdin, or runs a REPL

use anyhow::Context;
use clap::Parser;
use mom_policy::input_handling::{
    detect_input_source, read_input_content, InputConfig, InputSource,
};
use mom_policy::{Policy, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mom-policy")]
#[command(about = "Evaluate MOM memory overcommitment policies")]
struct Args {
    /// Input source type (detected from the other arguments when omitted)
    #[arg(short, long, value_enum)]
    input: Option<InputSource>,

    /// Policy text (when using --input string)
    #[arg(short, long)]
    string: Option<String>,

    /// Policy file (when using --input file)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print the results as one JSON array
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let source = match args.input {
        Some(source) => source,
        None => detect_input_source(&args.file, &args.string)?,
    };

    if source == InputSource::Interactive {
        return run_interactive(args.verbose);
    }

    let config = InputConfig::from_args(source, args.file, args.string, args.verbose)?;
    let input = read_input_content(&config)?;
    let policy = Policy::parse(&input.content)
        .with_context(|| format!("failed to parse {}", input.source_name))?;
    let results = policy
        .evaluate(&[])
        .with_context(|| format!("failed to evaluate {}", input.source_name))?;

    print_results(&results, args.json)
}

fn print_results(results: &[Value], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(results)?);
    } else {
        for value in results {
            println!("{}", value);
        }
    }
    Ok(())
}

#[cfg(feature = "repl")]
fn run_interactive(verbose: bool) -> anyhow::Result<()> {
    use mom_policy::parser::ParseError;
    use mom_policy::{Evaluator, PolicyError};
    use rustyline::error::ReadlineError;

    println!("mom-policy REPL. Type :help for commands, :quit to exit.");

    let mut editor = rustyline::DefaultEditor::new()?;
    let mut evaluator = Evaluator::new();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "policy> " } else { "   ...> " };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        if buffer.is_empty() && line.trim_start().starts_with(':') {
            match line.trim() {
                ":quit" | ":q" => break,
                ":reset" => {
                    evaluator = Evaluator::new();
                    println!("evaluator reset");
                }
                ":funcs" => {
                    let mut names: Vec<_> = evaluator.functions().keys().cloned().collect();
                    names.sort();
                    println!("{}", names.join(" "));
                }
                ":builtins" => {
                    println!(
                        "{}",
                        mom_policy::runtime::stdlib::builtin_names().join(" ")
                    );
                }
                _ => {
                    println!(":help      this message");
                    println!(":funcs     list user functions");
                    println!(":builtins  list built-in functions");
                    println!(":reset     forget all definitions");
                    println!(":quit      leave the REPL");
                }
            }
            continue;
        }

        buffer.push_str(&line);
        buffer.push('\n');

        match mom_policy::eval_str(&mut evaluator, &buffer) {
            // keep reading until the brackets balance
            Err(PolicyError::Syntax(ParseError::UnclosedOpen { .. })) => continue,
            Ok(results) => {
                let _ = editor.add_history_entry(buffer.trim_end());
                for value in results {
                    println!("{}", value);
                }
            }
            Err(e) => {
                let _ = editor.add_history_entry(buffer.trim_end());
                eprintln!("error: {}", e);
                if verbose {
                    eprintln!("{:?}", e);
                }
            }
        }
        buffer.clear();
    }
    Ok(())
}

#[cfg(not(feature = "repl"))]
fn run_interactive(_verbose: bool) -> anyhow::Result<()> {
    Err(mom_policy::input_handling::InputError::InteractiveNotSupported.into())
}
