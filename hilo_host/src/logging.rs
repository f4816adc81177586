//! Structured logging configuration.
//!
//! `log` records from the `hilo` library are bridged into the same
//! subscriber, so one `RUST_LOG` filter covers everything.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,hyper=warn,tower_http=warn";

/// Initialize structured logging
///
/// # Example
///
/// ```no_run
/// use hilo_host::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Host starting");
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

    // try_init: a second call (tests, embedding) keeps the first subscriber
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!("Structured logging initialized");
    }
}

/// Log a slow operation at warn, everything else at debug
pub fn log_performance(operation: &str, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            "Performance metric"
        );
    }
}
