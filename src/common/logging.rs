//! Logging and tracing configuration
//!
//! Provides structured logging for client, daemon and the hidden template
//! modes. Anything that shares stdout with test output or the fork server
//! protocol logs to stderr only.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Initialize tracing for the one-shot client
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ltest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for the daemon (file + stderr logging)
///
/// The daemon logs to both:
/// 1. A log file at `~/.local/share/ltest/logs/daemon.log`
/// 2. stderr
///
/// Returns the log file path when file logging could be set up.
pub fn init_daemon() -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ltest=debug,info"));

    let log_file = paths::log_dir().and_then(|log_dir| {
        std::fs::create_dir_all(&log_dir).ok()?;
        let log_file = log_dir.join("daemon.log");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
        {
            Ok(file) => Some((log_file, file)),
            Err(e) => {
                eprintln!("Warning: Could not open log file: {}", e);
                None
            }
        }
    });

    let (path, file) = log_file.unzip();
    daemon_subscriber(filter, file).init();
    path
}

/// Daemon subscriber: optional file layer plus compact stderr
fn daemon_subscriber(
    filter: EnvFilter,
    file: Option<File>,
) -> impl Subscriber + Send + Sync + 'static {
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
}

/// Initialize tracing for the fork server and spawned entry workers
///
/// stdout belongs to the fork server protocol or to the test runner.
pub fn init_template() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ltest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}
