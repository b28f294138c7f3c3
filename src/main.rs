//! Strand - local-first issue tracking with dependency scheduling

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = strand_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
