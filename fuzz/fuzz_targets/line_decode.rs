//! Arbitrary bytes as a single line: decoding must never panic, and anything
//! that decodes to an encodable message must survive a second round.

#![no_main]

use flightlink_proto::{ProtocolMessage, decode, decode_bytes, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(Some(message)) = decode_bytes(data) else {
        return;
    };
    if matches!(message, ProtocolMessage::Unknown { .. }) {
        return;
    }

    let frame = encode(&message).expect("decoded messages re-encode");
    let text = std::str::from_utf8(&frame).expect("encoder emits UTF-8");
    let again = decode(text).expect("encoder output decodes").expect("non-empty frame");
    assert_eq!(again.kind(), message.kind());
});
