//! CLI module for mtls-echo.

use std::io;

use clap::Parser;
use mtls_echo_acceptor::AcceptorEndpoint;
use mtls_echo_initiator::InitiatorEndpoint;
use mtls_echo_proto::credentials::{Credentials, Role};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// mtls-echo CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mtls-echo",
    version,
    about = "Mutually-authenticated TLS line echo"
)]
pub struct Args {
    /// Listen for connections instead of dialling out.
    #[arg(long)]
    pub server: bool,
}

/// Run the selected role to completion.
pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    run_with(args, Settings::from_env()).await
}

async fn run_with(args: Args, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = Credentials::load(&settings.keys_dir)?;

    if args.server {
        run_acceptor(&settings, &credentials).await
    } else {
        run_initiator(&settings, &credentials).await
    }
}

async fn run_acceptor(
    settings: &Settings,
    credentials: &Credentials,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = AcceptorEndpoint::bind(
        settings.listen,
        credentials.identity(Role::Acceptor),
        credentials.trust_anchors(),
        settings.options,
    )
    .await?;

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    endpoint.serve(shutdown).await?;
    Ok(())
}

async fn run_initiator(
    settings: &Settings,
    credentials: &Credentials,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = InitiatorEndpoint::new(
        credentials.identity(Role::Initiator),
        credentials.trust_anchors(),
        &settings.server_name,
        settings.options,
    )?;

    let summary = endpoint.run(&settings.remote).await?;
    info!(
        received = summary.lines_received,
        sent = summary.lines_sent,
        "initiator finished"
    );
    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flag_selects_initiator() {
        let args = Args::try_parse_from(["mtls-echo"]).unwrap();
        assert!(!args.server);
    }

    #[test]
    fn server_flag_selects_acceptor() {
        let args = Args::try_parse_from(["mtls-echo", "--server"]).unwrap();
        assert!(args.server);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Args::try_parse_from(["mtls-echo", "--client"]).is_err());
    }

    #[tokio::test]
    async fn empty_keys_dir_fails_before_any_network_activity() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            keys_dir: dir.path().to_path_buf(),
            ..Settings::from_env()
        };

        let args = Args::try_parse_from(["mtls-echo"]).unwrap();
        let message = run_with(args, settings).await.unwrap_err().to_string();
        assert!(
            message.starts_with("failed to load certificate from"),
            "{message}"
        );
        assert!(message.contains("initiator.crt"), "{message}");
        assert!(
            message.contains(&dir.path().display().to_string()),
            "{message}"
        );
    }
}
