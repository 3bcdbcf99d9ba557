//! Transport abstraction traits for Huddle.
//!
//! A connection is split into two halves. The [`FrameReader`] is owned by the
//! session's read loop. The [`FrameWriter`] is shared: the session's write
//! loop and the hub (for direct signal delivery) both write through it.

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Inbound frame exceeded the configured limit.
    #[error("Frame of {size} bytes exceeds limit of {limit}")]
    FrameTooLarge { size: usize, limit: usize },
}

/// The inbound half of a connection.
#[async_trait]
pub trait FrameReader: Send {
    /// Receive the next text frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection cleanly.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;
}

/// The outbound half of a connection.
///
/// Implementations must tolerate concurrent callers and must make `close`
/// single-shot: the first call closes the transport, later calls return
/// `Ok(())` without touching it.
#[async_trait]
pub trait FrameWriter: Send + Sync {
    /// Send one text frame.
    async fn send(&self, text: String) -> Result<(), TransportError>;

    /// Close the connection.
    async fn close(&self) -> Result<(), TransportError>;

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
