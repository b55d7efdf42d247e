//! Structured logging configuration.
//!
//! Installs a `tracing` subscriber. The library crate logs through the `log`
//! facade; those records are bridged into the same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, falling back to `info` with sqlx and
/// hyper quietened.
///
/// # Example
///
/// ```no_run
/// use golf_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a rejected connection attempt with structured fields
pub fn log_rejected_connection(game_id: &str, reason: &str, player_id: Option<&str>) {
    tracing::warn!(
        game_id = game_id,
        player_id = player_id,
        reason = reason,
        "WebSocket connection rejected"
    );
}

/// Log the end of a socket session
pub fn log_session_closed(game_id: &str, player_id: &str, frames_received: u64, duration_ms: u64) {
    tracing::info!(
        game_id = game_id,
        player_id = player_id,
        frames_received = frames_received,
        duration_ms = duration_ms,
        "WebSocket session closed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_log_helpers() {
        // Just ensure they don't panic without a subscriber
        log_rejected_connection("g1", "invalid session", None);
        log_rejected_connection("g1", "not a player", Some("alice"));
        log_session_closed("g1", "alice", 12, 3400);
    }
}
