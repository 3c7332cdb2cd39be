//! `flightlink-monitor`: connect to a simulator, send controls, watch state.

use std::process::ExitCode;

use clap::Parser;
use flightlink_cli::monitor::{self, MonitorArgs};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = MonitorArgs::parse();
    match monitor::run(&args).await {
        Ok(report) => {
            tracing::info!(samples = report.samples.len(), "done");
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!(host = %args.host, port = args.port, error = %e, "monitor failed");
            ExitCode::FAILURE
        },
    }
}
