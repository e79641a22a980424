//! Structured Logger
//!
//! Console output plus an optional daily-rolling NDJSON file, with the level
//! taken from `RUST_LOG` when set.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global logger. Safe to call more than once; later calls are ignored.
///
/// Console logs go to stderr so stdout stays clean for the final answer.
pub fn init_logger(log_dir: Option<&Path>, level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let file_layer = log_dir.map(|dir| {
        // Writes NDJSON to `<dir>/navigator.log.YYYY-MM-DD`
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "navigator.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
