//! Logging setup
//!
//! Library code logs through the `log` facade. `init` bridges those records
//! into a `tracing` fmt subscriber writing to stderr or a log file. The level
//! filter sits behind a reload layer so `set_verbosity` can change it while
//! the daemon runs.

use crate::config::LoggingConfig;
use crate::shutdown::lock;
use lazy_static::lazy_static;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

lazy_static! {
    static ref FILTER: Mutex<Option<reload::Handle<EnvFilter, Registry>>> = Mutex::new(None);
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a logger is already installed: {0}")]
    AlreadyInstalled(String),

    #[error("logging has not been initialized")]
    NotInstalled,

    #[error("cannot change the log level: {0}")]
    Reload(String),
}

/// Maps a configured verbosity to a level. Unknown values mean `debug`.
pub fn verbosity_level(verbosity: &str) -> LevelFilter {
    match verbosity.trim().to_ascii_lowercase().as_str() {
        "5" | "debug" => LevelFilter::DEBUG,
        "4" | "info" => LevelFilter::INFO,
        "3" | "warn" => LevelFilter::WARN,
        // no level above error
        "2" | "error" | "1" | "critical" => LevelFilter::ERROR,
        _ => LevelFilter::DEBUG,
    }
}

/// Installs the global subscriber. `RUST_LOG`, when set, overrides the
/// configured verbosity until the next `set_verbosity`.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = verbosity_level(&config.verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let (filter, handle) = reload::Layer::new(filter);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.log.trim() == "stdio" {
        let layer = fmt::layer().with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))
    } else {
        let path = PathBuf::from(config.log.trim());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggingError::Open { path, source })?;
        let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
        tracing::subscriber::set_global_default(registry.with(layer))
    };
    installed.map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;
    *lock(&FILTER) = Some(handle);

    tracing_log::LogTracer::init().map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;
    log::debug!("logging initialized at level {}", level);
    Ok(())
}

/// Replaces the active level filter. Accepts the same values as the
/// `verbosity` setting.
pub fn set_verbosity(verbosity: &str) -> Result<LevelFilter, LoggingError> {
    let level = verbosity_level(verbosity);
    let guard = lock(&FILTER);
    let handle = guard.as_ref().ok_or(LoggingError::NotInstalled)?;
    handle
        .reload(EnvFilter::new(level.to_string()))
        .map_err(|e| LoggingError::Reload(e.to_string()))?;
    Ok(level)
}
