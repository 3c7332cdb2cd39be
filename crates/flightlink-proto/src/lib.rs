//! Wire format for the flightlink protocol.
//!
//! A controller and a flight simulator exchange JSON objects over a single
//! TCP stream, one object per line. Every object carries a `type` tag that
//! selects the [`ProtocolMessage`] variant:
//!
//! ```text
//! server -> client   welcome | state | ack | error
//! client -> server   control | query
//! ```
//!
//! The line framing is deliberately length-independent: a frame ends at the
//! first `\n`, and compact JSON never contains an unescaped newline, so the
//! receiver only has to scan for the terminator. [`LineBuffer`] does that
//! reassembly across arbitrary read boundaries and [`codec`] turns single
//! lines into messages.
//!
//! # Recoverability
//!
//! A malformed line is a [`CodecError`] for that line only. Callers drop the
//! line and keep reading; nothing in this crate tears a stream down except an
//! unterminated line that outgrows [`MAX_LINE_LENGTH`].
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod framing;
pub mod message;
pub mod state;

pub use codec::{decode, decode_bytes, encode};
pub use errors::{CodecError, Result};
pub use framing::{LineBuffer, MAX_LINE_LENGTH};
pub use message::{Ack, ErrorMessage, GET_STATE_COMMAND, ProtocolMessage, Query, Welcome};
pub use state::{ControlCommand, FEATURE_COUNT, Orientation, StateSnapshot, Vec3};

/// Protocol version announced in the server's `welcome` frame.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Port the reference simulator listens on.
pub const DEFAULT_PORT: u16 = 9090;
