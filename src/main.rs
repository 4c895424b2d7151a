use std::process::ExitCode;

use gateguard_cli::cli::app::run;

/// Exit status for startup and command failures; `1` is reserved for a
/// `before` block decision.
const FAILURE_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("gateguard: {err:#}");
            ExitCode::from(FAILURE_EXIT)
        }
    }
}
