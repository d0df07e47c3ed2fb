//! Main entry point for the conduit demo CLI

use std::process::ExitCode;

fn main() -> ExitCode {
    match conduit_demos::run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
