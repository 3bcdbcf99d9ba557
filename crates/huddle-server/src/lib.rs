//! # huddle-server
//!
//! HTTP and WebSocket front end for the Huddle room hub.

pub mod config;
pub mod handlers;
pub mod metrics;

pub use config::Config;
pub use handlers::{build_router, run_server, AppState};
