//! Logging and observability helpers.

use std::fs;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::{data_dir, VaultConfig};

const LOG_FILE_PREFIX: &str = "sourcevault.log";

/// `RUST_LOG` first, then the configured filter
fn resolve_filter(config: &VaultConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_FILTER))
}

/// Installs a daily rolling file subscriber under the data directory
///
/// A subscriber that is already installed wins.
pub fn init_tracing(config: &VaultConfig) {
    let log_dir = data_dir().join("logs");
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("sourcevault: cannot create log directory {:?}: {}", log_dir, e);
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(config))
        .with_writer(tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX))
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
