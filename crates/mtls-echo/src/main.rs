//! mtls-echo: a line echo over mutually-authenticated TLS.
//!
//! - `mtls-echo --server` listens on port 10000 and serves every authorized
//!   initiator on its own task
//! - `mtls-echo` dials `localhost:10000`, sends the greeting and echoes until
//!   the exchange winds down

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod settings;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Args::parse();

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
