//! Session error types.
//!
//! Only connection establishment and outbound sends return errors to the
//! caller. Failures on the receive path are absorbed by the receive task,
//! which flips the session to disconnected instead.

use std::{io, time::Duration};

use flightlink_proto::CodecError;
use thiserror::Error;

/// Failure to establish a session.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Nothing is listening at the endpoint.
    #[error("connection refused by {endpoint}")]
    ConnectionRefused {
        /// Endpoint that refused the connection.
        endpoint: String,
    },

    /// The TCP connect did not complete in time.
    #[error("timed out connecting to {endpoint}")]
    ConnectTimeout {
        /// Endpoint that did not answer.
        endpoint: String,
    },

    /// The stream opened but the server never sent a usable welcome.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Any other I/O failure while connecting.
    #[error("failed to connect to {endpoint}: {source}")]
    Io {
        /// Endpoint being connected to.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ConnectError {
    /// Classify an I/O error from the connect call.
    pub fn from_io(endpoint: impl Into<String>, source: io::Error) -> Self {
        let endpoint = endpoint.into();
        match source.kind() {
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused { endpoint },
            io::ErrorKind::TimedOut => Self::ConnectTimeout { endpoint },
            _ => Self::Io { endpoint, source },
        }
    }
}

/// The `welcome` exchange failed.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// No welcome within the handshake timeout.
    #[error("no welcome frame within {0:?}")]
    Timeout(Duration),

    /// The server closed the stream before greeting.
    #[error("connection closed before welcome")]
    Closed,

    /// The first frame was not valid.
    #[error("malformed welcome frame: {0}")]
    Decode(#[from] CodecError),

    /// The first frame was some other message.
    #[error("expected welcome, got {kind}")]
    UnexpectedMessage {
        /// Type of the frame that arrived instead.
        kind: String,
    },

    /// Reading the welcome failed.
    #[error("I/O error during handshake: {0}")]
    Io(#[from] io::Error),
}

/// Failure to send a control or query frame.
#[derive(Debug, Error)]
pub enum SendError {
    /// The session is not connected.
    #[error("not connected")]
    NotConnected,

    /// The message could not be encoded.
    #[error(transparent)]
    Encode(#[from] CodecError),

    /// The write failed. The session is now disconnected.
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}
