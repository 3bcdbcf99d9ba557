//! Internal message type routed by the hub.

use huddle_protocol::{MessageFrame, MessageKind, Payload, SignalFrame};

use crate::session::SessionBinding;

/// Sender name used for messages the hub generates itself.
pub const SYSTEM_SENDER: &str = "sustav";

/// One unit of room traffic.
///
/// Messages are immutable once built; the hub shares a single allocation
/// between every recipient during fan-out.
#[derive(Debug, Clone)]
pub struct Message {
    /// Delivery mode and meaning.
    pub kind: MessageKind,
    /// Target room.
    pub room_id: String,
    /// Identity of the originating client.
    pub sender: String,
    /// Human readable text.
    pub content: String,
    /// Opaque payload, relayed byte for byte.
    pub data: Option<Payload>,
}

impl Message {
    /// Create a new message without a payload.
    #[must_use]
    pub fn new(
        kind: MessageKind,
        room_id: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            room_id: room_id.into(),
            sender: sender.into(),
            content: content.into(),
            data: None,
        }
    }

    /// Create a chat message.
    #[must_use]
    pub fn chat(
        room_id: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(MessageKind::Chat, room_id, sender, content)
    }

    /// Create a signal message carrying `data`.
    #[must_use]
    pub fn signal(room_id: impl Into<String>, sender: impl Into<String>, data: Payload) -> Self {
        Self::new(MessageKind::Signal, room_id, sender, "").with_data(data)
    }

    /// Create a hub notification.
    #[must_use]
    pub fn notification(room_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageKind::Notification, room_id, SYSTEM_SENDER, content)
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    /// Build a message from an inbound frame.
    ///
    /// A frame that names no room or sender inherits them from the session
    /// it arrived on.
    #[must_use]
    pub fn from_frame(frame: MessageFrame, binding: &SessionBinding) -> Self {
        let room_id = if frame.room_id.is_empty() {
            binding.room_id.clone()
        } else {
            frame.room_id
        };
        let sender = if frame.username.is_empty() {
            binding.identity.clone()
        } else {
            frame.username
        };

        Self {
            kind: frame.kind,
            room_id,
            sender,
            content: frame.content,
            data: frame.data,
        }
    }

    /// The frame written to a session's transport.
    #[must_use]
    pub fn to_frame(&self) -> MessageFrame {
        MessageFrame {
            kind: self.kind,
            data: self.data.clone(),
            content: self.content.clone(),
            room_id: self.room_id.clone(),
            username: self.sender.clone(),
        }
    }

    /// The frame delivered to the other members for a signal.
    #[must_use]
    pub fn to_signal_frame(&self) -> SignalFrame {
        SignalFrame::new(self.room_id.clone(), self.sender.clone(), self.data.clone())
    }
}
