//! Configuration loading and validation

pub mod types;

pub use types::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl MomConfig {
    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MomConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("main.main-loop-interval", self.main.main_loop_interval),
            ("main.host-monitor-interval", self.main.host_monitor_interval),
            ("main.guest-manager-interval", self.main.guest_manager_interval),
            ("main.guest-monitor-interval", self.main.guest_monitor_interval),
            ("main.policy-engine-interval", self.main.policy_engine_interval),
        ];
        for (key, value) in intervals {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(key, format!("{} is not a positive number of seconds", value)));
            }
        }
        let timeouts = [
            ("shutdown.policy-engine", self.shutdown.policy_engine),
            ("shutdown.guest-manager", self.shutdown.guest_manager),
            ("shutdown.host-monitor", self.shutdown.host_monitor),
            ("shutdown.guest-monitor", self.shutdown.guest_monitor),
        ];
        for (key, value) in timeouts {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(key, format!("{} is not a valid timeout", value)));
            }
        }
        if self.main.sample_history_length < 1 {
            return Err(invalid("main.sample-history-length", "must be at least 1".to_string()));
        }
        if self.main.hypervisor_interface.trim().is_empty() {
            return Err(invalid("main.hypervisor-interface", "must not be empty".to_string()));
        }
        Ok(())
    }

    /// Policy file path, if one is configured.
    pub fn policy_path(&self) -> Option<&Path> {
        non_empty_path(&self.main.policy)
    }

    /// Plot base directory, if plotting is enabled.
    pub fn plot_dir(&self) -> Option<&Path> {
        non_empty_path(&self.main.plot_dir)
    }
}

fn non_empty_path(value: &str) -> Option<&Path> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Path::new(trimmed))
    }
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message,
    }
}
