//! Prometheus metrics for monitoring the host.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`init_metrics`] installs the exporter.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts by path and status
//! - **WebSocket Metrics**: Active connections, messages sent/received
//! - **Round Metrics**: Commands by outcome, finished rounds
//! - **Table Metrics**: Subscribers and dropped state deliveries

use hilo::table::TableStats;
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
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("hilo_http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// A connection was established.
pub fn websocket_connection_opened() {
    metrics::counter!("hilo_websocket_connections_total").increment(1);
    metrics::gauge!("hilo_websocket_connections_active").increment(1.0);
}

/// A connection ended.
pub fn websocket_connection_closed() {
    metrics::gauge!("hilo_websocket_connections_active").decrement(1.0);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("hilo_websocket_messages_sent").increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("hilo_websocket_messages_received").increment(1);
}

/// A frame that did not decode.
pub fn websocket_messages_malformed() {
    metrics::counter!("hilo_websocket_messages_malformed").increment(1);
}

// ============================================================================
// Round Metrics
// ============================================================================

/// Record a handled command. `outcome` is `applied`, `rejected` or `stale`.
pub fn commands_total(command: &'static str, outcome: &'static str) {
    metrics::counter!("hilo_commands_total",
        "command" => command,
        "outcome" => outcome
    )
    .increment(1);
}

/// Increment finished rounds counter.
pub fn rounds_finished_total() {
    metrics::counter!("hilo_rounds_finished_total").increment(1);
}

// ============================================================================
// Table Metrics
// ============================================================================

/// Publish the table's own counters.
pub fn table_stats(stats: &TableStats) {
    metrics::gauge!("hilo_table_subscribers").set(stats.subscribers as f64);
    metrics::counter!("hilo_state_deliveries_dropped_total").absolute(stats.dropped_deliveries);
}
