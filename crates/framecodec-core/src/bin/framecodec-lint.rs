//! Thin CLI: loads a schema file, builds a `Parser`, and prints the
//! error-collector report. Exercises the logging/error stack end-to-end; it
//! does not drive a bus.

use std::fs;
use std::process::ExitCode;

use framecodec_core::{ErrorCollector, Parser, SchemaDocument};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: framecodec-lint <schema.toml>");
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let document = match SchemaDocument::parse(&source) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("{path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let collector = ErrorCollector::new();
    let (parser, faults) = Parser::new(&collector, &document, path.as_str());

    println!(
        "{}: {} vars, {} arrays, {} cmds, {} faults",
        parser.instance_name(),
        document.var.len(),
        document.array.len(),
        document.cmd.len(),
        faults,
    );

    if faults == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
