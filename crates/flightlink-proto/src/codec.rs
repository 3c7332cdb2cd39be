//! Single-line message codec.
//!
//! [`encode`] produces exactly one line including its terminator. [`decode`]
//! consumes one line that has already been split off the stream, without its
//! terminator. Splitting is the job of [`crate::LineBuffer`].

use serde_json::Value;

use crate::{
    errors::{CodecError, Result},
    message::ProtocolMessage,
};

/// Frame terminator.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Serialize a message as compact JSON followed by `\n`.
///
/// Compact JSON escapes control characters inside strings, so the only
/// newline in the output is the terminator.
pub fn encode(message: &ProtocolMessage) -> Result<Vec<u8>> {
    let mut frame = serde_json::to_vec(message).map_err(CodecError::Encode)?;
    frame.push(FRAME_DELIMITER);
    Ok(frame)
}

/// Decode one line.
///
/// Surrounding whitespace (including a stray `\r`) is ignored and a blank
/// line yields `Ok(None)`. A valid object with an unrecognized `type`
/// decodes to [`ProtocolMessage::Unknown`] so the caller can report it.
pub fn decode(line: &str) -> Result<Option<ProtocolMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line).map_err(CodecError::Decode)?;
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(CodecError::MissingType);
    };
    if !ProtocolMessage::is_known_kind(kind) {
        return Ok(Some(ProtocolMessage::Unknown { kind: kind.to_owned() }));
    }

    serde_json::from_value(value).map(Some).map_err(CodecError::Decode)
}

/// Decode one line of raw bytes.
pub fn decode_bytes(line: &[u8]) -> Result<Option<ProtocolMessage>> {
    decode(std::str::from_utf8(line)?)
}
