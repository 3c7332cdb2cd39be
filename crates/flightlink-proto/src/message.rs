//! Protocol messages.
//!
//! One [`ProtocolMessage`] per line, tagged by its `type` field.

use serde::{Deserialize, Serialize};

use crate::state::{ControlCommand, StateSnapshot};

/// The only query command the simulator understands.
pub const GET_STATE_COMMAND: &str = "getState";

/// Greeting sent once by the server immediately after accepting a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Welcome {
    /// Human-readable greeting.
    pub message: String,
    /// Server protocol version.
    pub version: String,
}

/// Acknowledgement of a `control` message.
///
/// There is no correlation id: an ack confirms that *a* control message was
/// received, not which one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Optional diagnostic text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error reported by the peer. Never fatal to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessage {
    /// Description of what went wrong.
    pub message: String,
}

/// On-demand request sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Query command, normally [`GET_STATE_COMMAND`].
    pub command: String,
}

impl Query {
    /// Request a fresh `state` frame.
    pub fn get_state() -> Self {
        Self { command: GET_STATE_COMMAND.to_string() }
    }
}

/// A single frame of the protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    /// Server greeting, first frame of every connection.
    Welcome(Welcome),
    /// Simulator state, pushed on a fixed cadence and in reply to `query`.
    State(StateSnapshot),
    /// Acknowledgement of a control message.
    Ack(Ack),
    /// Error report.
    Error(ErrorMessage),
    /// Control tuple from the client.
    Control(ControlCommand),
    /// Query from the client.
    Query(Query),
    /// A well-formed frame whose `type` this side does not know.
    ///
    /// Produced only by [`crate::decode`]; it cannot be encoded.
    #[serde(skip)]
    Unknown {
        /// The `type` value that was received.
        kind: String,
    },
}

impl ProtocolMessage {
    /// Every `type` value with a dedicated variant.
    pub const KINDS: [&'static str; 6] = ["welcome", "state", "ack", "error", "control", "query"];

    /// The wire `type` of this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::Welcome(_) => "welcome",
            Self::State(_) => "state",
            Self::Ack(_) => "ack",
            Self::Error(_) => "error",
            Self::Control(_) => "control",
            Self::Query(_) => "query",
            Self::Unknown { kind } => kind,
        }
    }

    /// Whether a `type` value has a dedicated variant.
    pub fn is_known_kind(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn control_is_flat_object_with_type_tag() {
        let msg = ProtocolMessage::Control(ControlCommand::new(0.7, 0.0, 0.0, 0.0));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "control", "throttle": 0.7, "elevator": 0.0, "aileron": 0.0, "rudder": 0.0})
        );
    }

    #[test]
    fn query_matches_wire_format() {
        let value = serde_json::to_value(ProtocolMessage::Query(Query::get_state())).unwrap();
        assert_eq!(value, json!({"type": "query", "command": "getState"}));
    }

    #[test]
    fn ack_without_message_omits_field() {
        let value = serde_json::to_value(ProtocolMessage::Ack(Ack::default())).unwrap();
        assert_eq!(value, json!({"type": "ack"}));
    }

    #[test]
    fn welcome_tolerates_missing_fields() {
        let msg: ProtocolMessage = serde_json::from_str(r#"{"type":"welcome"}"#).unwrap();
        assert_eq!(msg, ProtocolMessage::Welcome(Welcome::default()));
    }

    #[test]
    fn unknown_variant_cannot_be_serialized() {
        let msg = ProtocolMessage::Unknown { kind: "telemetry".into() };
        assert!(serde_json::to_string(&msg).is_err());
        assert_eq!(msg.kind(), "telemetry");
    }

    #[test]
    fn kind_matches_tag() {
        for (msg, tag) in [
            (ProtocolMessage::Welcome(Welcome::default()), "welcome"),
            (ProtocolMessage::State(StateSnapshot::default()), "state"),
            (ProtocolMessage::Ack(Ack::default()), "ack"),
            (ProtocolMessage::Error(ErrorMessage::default()), "error"),
            (ProtocolMessage::Control(ControlCommand::default()), "control"),
            (ProtocolMessage::Query(Query::get_state()), "query"),
        ] {
            assert_eq!(msg.kind(), tag);
            assert!(ProtocolMessage::is_known_kind(tag));
            assert_eq!(serde_json::to_value(&msg).unwrap()["type"], tag);
        }
    }
}
