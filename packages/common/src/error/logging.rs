//! Structured logging infrastructure
//!
//! `env_logger` behind the standard `log` facade. Library crates that log
//! through `tracing` reach the same sink through tracing's `log` feature.

use log::{debug, info, warn, LevelFilter};
use std::sync::Once;
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// Logging bootstrap and the shared log-line shapes used by the demos
pub struct LoggingTransformer;

impl LoggingTransformer {
    /// Initialize logging (call once at startup; later calls are ignored)
    ///
    /// Levels come from `RUST_LOG`, e.g.
    /// - `RUST_LOG=debug` - everything including queue wakeups
    /// - `RUST_LOG=conduit_async=trace,conduit=info` - per-crate levels
    pub fn init() {
        Self::init_with_default(LevelFilter::Info);
    }

    /// Initialize logging with `default` used when `RUST_LOG` is unset
    pub fn init_with_default(default: LevelFilter) {
        INIT_LOGGER.call_once(|| {
            let mut builder = env_logger::Builder::new();
            builder.filter_level(default);
            builder.parse_default_env();
            builder.format_timestamp_micros();
            if let Err(e) = builder.try_init() {
                eprintln!("logger already installed: {e}");
                return;
            }

            debug!("Structured logging initialized (default level: {default})");
        });
    }

    /// Initialize logging for test environments
    ///
    /// Safe to call from every test; only the first call installs the logger.
    pub fn init_test() {
        let _ = env_logger::Builder::from_default_env()
            .is_test(true)
            .try_init();
    }

    /// Log the parameters a demo run starts with
    pub fn log_run_started(demo: &str, params: &[(&str, String)]) {
        let rendered = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!("Starting {demo} ({rendered})");
    }

    /// Log that a component stopped because its cancellation signal fired
    pub fn log_cancellation(component: &str) {
        warn!("{component} stopped: cancellation requested");
    }

    /// Log a fault without aborting the caller
    pub fn log_fault(component: &str, error: &dyn std::error::Error) {
        warn!("{component} failed: {error}");
    }

    /// Log performance metrics and timing information
    pub fn log_performance_metric(operation: &str, elapsed: Duration, success: bool) {
        let ms = elapsed.as_millis();
        if success {
            info!("Performance: {operation} completed in {ms}ms");
        } else {
            warn!("Performance: {operation} failed after {ms}ms");
        }
    }
}
