//! Server configuration.

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use flightlink_proto::{DEFAULT_PORT, PROTOCOL_VERSION};

/// Greeting carried by the `welcome` frame.
pub const DEFAULT_GREETING: &str = "Connected to Flight Simulation Server";

/// Settings for a [`crate::Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// Period of unsolicited `state` frames. Zero disables broadcasting.
    pub broadcast_interval: Duration,
    /// Version reported in `welcome`.
    pub version: String,
    /// Message reported in `welcome`.
    pub greeting: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            broadcast_interval: Duration::from_millis(100),
            version: PROTOCOL_VERSION.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

impl ServerConfig {
    /// Loopback on an ephemeral port, for tests and local tools.
    pub fn local() -> Self {
        Self { bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)), ..Self::default() }
    }
}
