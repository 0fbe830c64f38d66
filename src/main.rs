//! metashift binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match metashift::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            metashift::ui::output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
