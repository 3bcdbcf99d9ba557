//! # huddle-core
//!
//! Room hub, sessions and message fan-out for Huddle.
//!
//! - **Hub** - single coordinator task owning every room
//! - **Room** - named set of registered sessions
//! - **Session** - read and write loops pumping one connection
//! - **RoomDirectory** - read-only snapshots for room and session listings
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐ broadcast ┌─────────────┐ enqueue ┌─────────────┐
//! │  read loop  │──────────▶│     Hub     │────────▶│ write loop  │
//! └─────────────┘           └─────────────┘         └─────────────┘
//!                                  │ signal (direct)        │
//!                                  ▼                        ▼
//!                           ┌─────────────────────────────────┐
//!                           │         FrameWriter             │
//!                           └─────────────────────────────────┘
//! ```

pub mod directory;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod room;
pub mod session;

pub use directory::{RoomDirectory, RoomInfo, SessionInfo};
pub use hub::{Hub, HubConfig, HubError, HubHandle};
pub use message::{Message, SYSTEM_SENDER};
pub use room::{Room, RoomId};
pub use session::{join, Session, SessionBinding, SessionConfig, SessionHandle, SessionToken};
