//! Error types for encoding and decoding frames.

use thiserror::Error;

/// Errors produced while turning messages into lines and back.
///
/// Everything except [`CodecError::LineTooLong`] is scoped to a single line:
/// the receiver logs it, drops the line and continues with the next one.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The line is not valid JSON or does not match the message schema.
    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// The line is not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The JSON object has no string `type` field.
    #[error("frame has no message type")]
    MissingType,

    /// An unterminated line grew past the configured limit.
    #[error("unterminated frame of {len} bytes exceeds limit of {max} bytes")]
    LineTooLong {
        /// Bytes buffered without a terminator.
        len: usize,
        /// Maximum permitted line length.
        max: usize,
    },
}

impl CodecError {
    /// Whether the stream can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::LineTooLong { .. })
    }
}

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
