//! Command-line arguments for the `flightlink-server` binary.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use clap::Parser;
use flightlink_proto::DEFAULT_PORT;

use crate::config::ServerConfig;

/// Reference flight simulation endpoint.
#[derive(Debug, Parser)]
#[command(name = "flightlink-server", version, about)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// State broadcast rate in Hz. 0 disables broadcasting.
    #[arg(long, default_value_t = 10.0)]
    pub rate: f64,
}

impl Cli {
    /// Build the server configuration.
    ///
    /// # Errors
    ///
    /// Returns a message if the rate is negative or not a number.
    pub fn config(&self) -> Result<ServerConfig, String> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(format!("--rate must be a non-negative number, got {}", self.rate));
        }
        let broadcast_interval =
            if self.rate == 0.0 { Duration::ZERO } else { Duration::from_secs_f64(1.0 / self.rate) };

        Ok(ServerConfig {
            bind: SocketAddr::new(self.bind, self.port),
            broadcast_interval,
            ..ServerConfig::default()
        })
    }
}
