//! Metrics collection and export for Huddle.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format. Hub metrics are recorded in `huddle-core`.

use huddle_core::metrics::names as hub;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names owned by the server.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "huddle_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "huddle_connections_active";
    pub const HTTP_ERRORS_TOTAL: &str = "huddle_http_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of WebSocket connections since server start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of open WebSocket connections"
    );
    metrics::describe_counter!(names::HTTP_ERRORS_TOTAL, "Total number of failed API requests");
    metrics::describe_counter!(hub::SESSIONS_TOTAL, "Total number of room registrations");
    metrics::describe_gauge!(hub::SESSIONS_ACTIVE, "Sessions currently registered in a room");
    metrics::describe_gauge!(hub::ROOMS_ACTIVE, "Number of rooms");
    metrics::describe_counter!(hub::MESSAGES_TOTAL, "Messages broadcast, by kind");
    metrics::describe_counter!(hub::DELIVERIES_TOTAL, "Per-recipient deliveries");
    metrics::describe_counter!(hub::DROPS_TOTAL, "Messages dropped, by reason");
    metrics::describe_counter!(hub::DECODE_ERRORS_TOTAL, "Inbound frames discarded");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a failed API request.
pub fn record_http_error(route: &'static str) {
    counter!(names::HTTP_ERRORS_TOTAL, "route" => route).increment(1);
}

/// Metrics guard that tracks one open WebSocket connection.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Create a new metrics guard, recording a connection.
    #[must_use]
    pub fn new() -> Self {
        counter!(names::CONNECTIONS_TOTAL).increment(1);
        gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
    }
}
