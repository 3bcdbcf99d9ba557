//! Hub instrumentation.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding binary installs a recorder.

use huddle_protocol::MessageKind;
use metrics::{counter, gauge};

/// Metric names.
pub mod names {
    pub const SESSIONS_TOTAL: &str = "huddle_sessions_total";
    pub const SESSIONS_ACTIVE: &str = "huddle_sessions_active";
    pub const ROOMS_ACTIVE: &str = "huddle_rooms_active";
    pub const MESSAGES_TOTAL: &str = "huddle_messages_total";
    pub const DELIVERIES_TOTAL: &str = "huddle_deliveries_total";
    pub const DROPS_TOTAL: &str = "huddle_drops_total";
    pub const DECODE_ERRORS_TOTAL: &str = "huddle_decode_errors_total";
}

/// Why a message did not reach a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnknownRoom,
    QueueFull,
    QueueClosed,
    SignalWrite,
    Encode,
}

impl DropReason {
    fn as_str(self) -> &'static str {
        match self {
            DropReason::UnknownRoom => "unknown_room",
            DropReason::QueueFull => "queue_full",
            DropReason::QueueClosed => "queue_closed",
            DropReason::SignalWrite => "signal_write",
            DropReason::Encode => "encode",
        }
    }
}

pub(crate) fn record_registration(active: usize) {
    counter!(names::SESSIONS_TOTAL).increment(1);
    gauge!(names::SESSIONS_ACTIVE).set(active as f64);
}

pub(crate) fn set_active_sessions(active: usize) {
    gauge!(names::SESSIONS_ACTIVE).set(active as f64);
}

pub(crate) fn set_active_rooms(count: usize) {
    gauge!(names::ROOMS_ACTIVE).set(count as f64);
}

pub(crate) fn record_message(kind: MessageKind) {
    counter!(names::MESSAGES_TOTAL, "kind" => kind.as_str()).increment(1);
}

pub(crate) fn record_deliveries(count: usize) {
    counter!(names::DELIVERIES_TOTAL).increment(count as u64);
}

pub(crate) fn record_drop(reason: DropReason) {
    counter!(names::DROPS_TOTAL, "reason" => reason.as_str()).increment(1);
}

pub(crate) fn record_decode_error() {
    counter!(names::DECODE_ERRORS_TOTAL).increment(1);
}
