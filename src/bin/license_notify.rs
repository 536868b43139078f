use std::process::ExitCode;

use license_watch::cli::{init_tracing, run_notifier};

fn main() -> ExitCode {
    init_tracing();
    match run_notifier(std::env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
