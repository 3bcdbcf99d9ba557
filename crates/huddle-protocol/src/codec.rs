//! Codec for encoding and decoding Huddle frames.
//!
//! Every frame is a single JSON document carried in one WebSocket text message,
//! so there is no length prefix and no streaming reassembly.

use serde::Serialize;
use thiserror::Error;

use crate::frames::{MessageFrame, SignalFrame};

/// Maximum encoded frame size (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// JSON encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),

    /// JSON decoding error.
    #[error("Decoding error: {0}")]
    Decode(#[source] serde_json::Error),
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    let text = serde_json::to_string(value).map_err(ProtocolError::Encode)?;

    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(text.len()));
    }

    Ok(text)
}

/// Encode a message frame to JSON text.
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode_message(frame: &MessageFrame) -> Result<String, ProtocolError> {
    encode_json(frame)
}

/// Encode a signal frame to JSON text.
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode_signal(frame: &SignalFrame) -> Result<String, ProtocolError> {
    encode_json(frame)
}

/// Decode an inbound message frame.
///
/// # Errors
///
/// Returns an error if the text is too large or is not a valid frame.
pub fn decode_message(text: &str) -> Result<MessageFrame, ProtocolError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(text.len()));
    }

    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

/// Decode a signal frame, as a client receiving one would.
///
/// # Errors
///
/// Returns an error if the text is not a valid signal frame.
pub fn decode_signal(text: &str) -> Result<SignalFrame, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::MessageKind;
    use serde_json::value::RawValue;

    #[test]
    fn test_decode_full_frame() {
        let frame = decode_message(
            r#"{"type":"signal","data":{"candidate":"c1"},"content":"","roomId":"r1","username":"alice"}"#,
        )
        .unwrap();

        assert_eq!(frame.kind, MessageKind::Signal);
        assert_eq!(frame.data.as_deref().map(RawValue::get), Some(r#"{"candidate":"c1"}"#));
        assert_eq!(frame.room_id, "r1");
        assert_eq!(frame.username, "alice");
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode_message("not json"),
            Err(ProtocolError::Decode(_))
        ));
        assert!(matches!(
            decode_message(r#"{"content": 5}"#),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_too_large() {
        let text = format!(r#"{{"content":"{}"}}"#, "a".repeat(MAX_FRAME_SIZE));
        match decode_message(&text) {
            Err(ProtocolError::FrameTooLarge(_)) => {}
            other => panic!("Expected FrameTooLarge error, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_too_large() {
        let frame = MessageFrame::chat("r1", "alice", "a".repeat(MAX_FRAME_SIZE));
        match encode_message(&frame) {
            Err(ProtocolError::FrameTooLarge(_)) => {}
            other => panic!("Expected FrameTooLarge error, got {:?}", other),
        }
    }

    #[test]
    fn test_signal_payload_relayed_byte_for_byte() {
        let payloads = [
            r#"{"z":1,"a":2}"#,
            r#"{"n":123456789012345678901234567890}"#,
            r#"{"n":1e400}"#,
            r#"{"sdp": {"type": "offer", "sdp": "v=0\r\n"}, "extra": [1, 2, null]}"#,
            r#""just a string""#,
        ];

        for payload in payloads {
            let inbound = format!(r#"{{"type":"signal","data":{},"roomId":"r1"}}"#, payload);
            let frame = decode_message(&inbound).unwrap();
            let text = encode_signal(&SignalFrame::new("r1", "alice", frame.data)).unwrap();

            assert_eq!(
                text,
                format!(r#"{{"type":"signal","roomId":"r1","from":"alice","data":{}}}"#, payload)
            );
        }
    }

    #[test]
    fn test_signal_without_payload_has_null_data() {
        let frame = decode_message(r#"{"type":"signal","roomId":"r1"}"#).unwrap();
        let text = encode_signal(&SignalFrame::new("r1", "alice", frame.data)).unwrap();
        assert_eq!(text, r#"{"type":"signal","roomId":"r1","from":"alice","data":null}"#);
        assert!(decode_signal(&text).unwrap().data.is_none());
    }
}
