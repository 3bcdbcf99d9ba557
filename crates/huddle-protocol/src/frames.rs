//! Frame types for the Huddle wire protocol.
//!
//! Frames are JSON objects exchanged as WebSocket text messages. Clients send
//! [`MessageFrame`]s; the server answers with message frames for queued
//! traffic and [`SignalFrame`]s for peer negotiation payloads.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// An opaque JSON payload, kept as the exact text the client sent.
pub type Payload = Box<RawValue>;

/// Message kind carried in the `type` field.
///
/// Decoding is lenient: an absent, null, empty or unknown `type` is read as
/// [`MessageKind::Chat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "Option<String>")]
pub enum MessageKind {
    /// Plain chat text.
    #[default]
    Chat,
    /// Client announced it joined.
    Join,
    /// Client announced it left.
    Leave,
    /// Server generated notice (join/leave announcements).
    Notification,
    /// Opaque peer negotiation payload, never echoed to the sender.
    Signal,
}

impl MessageKind {
    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::Join => "join",
            MessageKind::Leave => "leave",
            MessageKind::Notification => "notification",
            MessageKind::Signal => "signal",
        }
    }
}

impl From<&str> for MessageKind {
    fn from(value: &str) -> Self {
        match value {
            "join" => MessageKind::Join,
            "leave" => MessageKind::Leave,
            "notification" => MessageKind::Notification,
            "signal" => MessageKind::Signal,
            _ => MessageKind::Chat,
        }
    }
}

impl From<Option<String>> for MessageKind {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(MessageKind::from).unwrap_or_default()
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> String {
        kind.as_str().to_string()
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat/notification frame, in both directions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageFrame {
    /// Message kind.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Opaque payload, omitted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    /// Human readable text.
    #[serde(default)]
    pub content: String,
    /// Target room.
    #[serde(rename = "roomId", default)]
    pub room_id: String,
    /// Sender identity.
    #[serde(default)]
    pub username: String,
}

impl MessageFrame {
    /// Create a chat frame.
    #[must_use]
    pub fn chat(
        room_id: impl Into<String>,
        username: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Chat,
            data: None,
            content: content.into(),
            room_id: room_id.into(),
            username: username.into(),
        }
    }

    /// Create a signal frame as a client would send it.
    #[must_use]
    pub fn signal(room_id: impl Into<String>, username: impl Into<String>, data: Payload) -> Self {
        Self {
            kind: MessageKind::Signal,
            data: Some(data),
            content: String::new(),
            room_id: room_id.into(),
            username: username.into(),
        }
    }
}

/// A signal as delivered to the other members of a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalFrame {
    /// Always `"signal"`.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Room the signal was sent in.
    #[serde(rename = "roomId")]
    pub room_id: String,
    /// Identity of the sender.
    pub from: String,
    /// Opaque payload, `null` when the sender sent none.
    pub data: Option<Payload>,
}

impl SignalFrame {
    /// Create a new signal frame.
    #[must_use]
    pub fn new(room_id: impl Into<String>, from: impl Into<String>, data: Option<Payload>) -> Self {
        Self {
            kind: MessageKind::Signal,
            room_id: room_id.into(),
            from: from.into(),
            data,
        }
    }
}
