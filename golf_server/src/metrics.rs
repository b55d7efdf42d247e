//! Prometheus metrics for monitoring game server health.
//!
//! Exported in Prometheus text format when an exporter is installed with
//! [`init_metrics`]. Without one the recording helpers are no-ops.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use golf_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::websocket_connection_opened();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// A socket joined a room.
pub fn websocket_connection_opened() {
    metrics::counter!("websocket_connections_total").increment(1);
    metrics::gauge!("websocket_connections_active").increment(1.0);
}

/// A socket left its room.
pub fn websocket_connection_closed() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

/// Increment WebSocket messages sent counter, labelled by frame type.
pub fn websocket_messages_sent(kind: &'static str) {
    metrics::counter!("websocket_messages_sent", "type" => kind).increment(1);
}

/// Inbound frame that was not a valid action.
pub fn websocket_malformed_message() {
    metrics::counter!("websocket_malformed_messages_total").increment(1);
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Set current active rooms count.
pub fn active_rooms(count: usize) {
    metrics::gauge!("active_rooms").set(count as f64);
}

/// Increment games dealt counter.
pub fn games_started_total() {
    metrics::counter!("games_started_total").increment(1);
}
