//! src/logging.rs
//! ============================================================================
//! # Tracing Initialization
//!
//! File-backed structured logging: env-filterable, daily-rotated, written
//! through a non-blocking appender so workers never stall on log I/O. Keep
//! the returned guard alive for the process lifetime or tail output is lost.

use std::path::Path;

use anyhow::Result;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Holds the appender guard; dropping it flushes and stops the log writer.
pub struct Logger {
    _guard: WorkerGuard,
}

/// Initialize global tracing with a rolling file in `log_dir`.
///
/// `default_level` applies when `RUST_LOG` is unset (e.g. `"info"` or
/// `"thumbview_core=debug"`).
pub fn init<P: AsRef<Path>>(log_dir: P, default_level: &str) -> Result<Logger> {
    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir.as_ref(), "thumbview.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    Ok(Logger { _guard: guard })
}
