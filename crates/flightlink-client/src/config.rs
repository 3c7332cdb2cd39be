//! Session configuration.

use std::time::Duration;

/// Tunables for a [`crate::Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on the TCP connect. `None` leaves it to the operating system.
    pub connect_timeout: Option<Duration>,
    /// How long to wait for the server's `welcome` frame.
    pub handshake_timeout: Duration,
    /// How long `disconnect()` waits for the receive task before aborting it.
    pub shutdown_timeout: Duration,
    /// Size of each socket read.
    pub read_buffer_size: usize,
    /// Longest unterminated frame accepted before the session is dropped.
    pub max_line_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            handshake_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(2),
            read_buffer_size: 4096,
            max_line_length: flightlink_proto::MAX_LINE_LENGTH,
        }
    }
}
