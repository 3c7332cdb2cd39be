//! `flightlink-server`: serve a held flight condition over the flightlink
//! protocol.

use std::process::ExitCode;

use clap::Parser;
use flightlink_server::{HoldStateSource, Server, cli::Cli};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid arguments");
            return ExitCode::FAILURE;
        },
    };

    info!(version = env!("CARGO_PKG_VERSION"), bind = %config.bind, interval = ?config.broadcast_interval, "starting");

    let server = match Server::bind(config, HoldStateSource::cruise()).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to bind");
            return ExitCode::FAILURE;
        },
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "server stopped");
                return ExitCode::FAILURE;
            }
        },
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    ExitCode::SUCCESS
}
