//! # huddle-protocol
//!
//! Wire frame definitions for the Huddle room hub.
//!
//! Clients and the server exchange JSON documents over WebSocket text
//! messages:
//!
//! - `MessageFrame` - chat, join/leave and notification traffic
//! - `SignalFrame` - peer negotiation payloads relayed to the rest of a room
//!
//! ## Example
//!
//! ```rust
//! use huddle_protocol::{codec, MessageFrame, MessageKind};
//!
//! let frame = codec::decode_message(r#"{"content":"hello","roomId":"lobby"}"#).unwrap();
//! assert_eq!(frame.kind, MessageKind::Chat);
//!
//! let text = codec::encode_message(&MessageFrame::chat("lobby", "alice", "hi")).unwrap();
//! assert!(text.contains("\"roomId\":\"lobby\""));
//! ```

pub mod codec;
pub mod frames;

pub use codec::{decode_message, encode_message, encode_signal, ProtocolError};
pub use frames::{MessageFrame, MessageKind, Payload, SignalFrame};
