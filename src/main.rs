//! Gatelock resource entry point.
//!
//! Reads one JSON request from standard input, runs the command named
//! by the program (symlinked `check`/`in`/`out`) or the first argument,
//! prints the JSON result to standard output, and exits with a status
//! the driver can dispatch on. Diagnostics go to stderr only.

use gatelock::commands::{self, Outcome};
use gatelock::exit_codes;
use std::io::Read;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let Some(invocation) = commands::resolve_invocation(&args) else {
        eprintln!("Error: expected a command of check, in or out");
        return ExitCode::from(exit_codes::CONFIG_ERROR as u8);
    };

    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("Error: failed to read request from stdin: {}", err);
        return ExitCode::from(exit_codes::CONFIG_ERROR as u8);
    }

    match commands::run(invocation.command, invocation.target_dir.as_deref(), &input) {
        Ok(Outcome::Response(value)) => {
            println!("{}", value);
            ExitCode::from(exit_codes::SUCCESS as u8)
        }
        // Nothing to fetch: clean exit, no result, no output files.
        Ok(Outcome::NoOp) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
