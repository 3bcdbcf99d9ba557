//! # huddle-transport
//!
//! Transport abstraction layer for Huddle sessions.
//!
//! A session never touches a socket directly. It reads text frames through a
//! [`FrameReader`] and writes them through a shared [`FrameWriter`]:
//!
//! - **WebSocket** - an upgraded axum socket (feature `websocket`, on by default)
//! - **Memory** - bounded in-process channels, for tests and benchmarks
//!
//! ```rust,ignore
//! use huddle_transport::FrameReader;
//!
//! async fn drain(mut reader: impl FrameReader) {
//!     while let Ok(Some(text)) = reader.recv().await {
//!         // Decode and forward
//!     }
//! }
//! ```

pub mod memory;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use memory::{MemoryPeer, MemoryReader, MemoryWriter};
pub use traits::{FrameReader, FrameWriter, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketReader, WebSocketWriter};
