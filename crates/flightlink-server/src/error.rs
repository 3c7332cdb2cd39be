//! Server errors.

use flightlink_proto::CodecError;
use thiserror::Error;

/// Failure while listening or serving a client.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded, or the client overran the line limit.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}
