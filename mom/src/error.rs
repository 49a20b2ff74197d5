//! Top level error type of the daemon library.

use crate::collectors::CollectorSetupError;
use crate::config::ConfigError;
use crate::hypervisor::HypervisorError;
use crate::logging::LoggingError;
use crate::registry::PluginError;
use mom_policy::PolicyError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MomError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("host monitor setup failed: {0}")]
    CollectorSetup(#[from] CollectorSetupError),

    #[error("hypervisor interface setup failed: {0}")]
    Hypervisor(#[from] HypervisorError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("unable to read policy file {}: {source}", .path.display())]
    PolicyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("thread {0} failed")]
    WorkerFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
