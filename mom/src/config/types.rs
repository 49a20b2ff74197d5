//! Daemon configuration types
//!
//! Maps to the sections of the TOML configuration file. Every key has a
//! default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MomConfig {
    pub main: MainConfig,
    pub host: HostConfig,
    pub guest: GuestConfig,
    pub logging: LoggingConfig,
    pub shutdown: ShutdownConfig,
}

/// `[main]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct MainConfig {
    /// Seconds between supervisor health checks
    pub main_loop_interval: f64,
    pub host_monitor_interval: f64,
    pub guest_manager_interval: f64,
    pub guest_monitor_interval: f64,
    pub policy_engine_interval: f64,
    /// Number of samples each monitor keeps
    pub sample_history_length: usize,
    /// Registered name of the hypervisor interface
    pub hypervisor_interface: String,
    /// Controllers invoked after every successful policy evaluation, in order
    pub controllers: Vec<String>,
    /// Policy file; empty means no policy
    pub policy: String,
    /// Base directory for plot output; empty disables plotting
    pub plot_dir: String,
}

impl Default for MainConfig {
    fn default() -> Self {
        MainConfig {
            main_loop_interval: 5.0,
            host_monitor_interval: 5.0,
            guest_manager_interval: 5.0,
            guest_monitor_interval: 5.0,
            policy_engine_interval: 10.0,
            sample_history_length: 10,
            hypervisor_interface: "libvirt".to_string(),
            controllers: vec!["Balloon".to_string()],
            policy: String::new(),
            plot_dir: String::new(),
        }
    }
}

/// `[host]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub collectors: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            collectors: vec!["HostMemory".to_string()],
        }
    }
}

/// `[guest]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GuestConfig {
    pub collectors: Vec<String>,
}

impl Default for GuestConfig {
    fn default() -> Self {
        GuestConfig {
            collectors: vec!["GuestQemuProc".to_string(), "GuestLibvirt".to_string()],
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `stdio` or a file path to append to
    pub log: String,
    /// `debug|5`, `info|4`, `warn|3`, `error|2` or `critical|1`
    pub verbosity: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log: "stdio".to_string(),
            verbosity: "info".to_string(),
        }
    }
}

/// `[shutdown]` section: how long to wait for each thread to finish
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ShutdownConfig {
    pub policy_engine: f64,
    pub guest_manager: f64,
    pub host_monitor: f64,
    pub guest_monitor: f64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        ShutdownConfig {
            policy_engine: 10.0,
            guest_manager: 5.0,
            host_monitor: 5.0,
            guest_monitor: 5.0,
        }
    }
}

/// Converts validated seconds to a `Duration`.
pub(crate) fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl MainConfig {
    pub fn main_loop_interval(&self) -> Duration {
        seconds(self.main_loop_interval)
    }

    pub fn host_monitor_interval(&self) -> Duration {
        seconds(self.host_monitor_interval)
    }

    pub fn guest_manager_interval(&self) -> Duration {
        seconds(self.guest_manager_interval)
    }

    pub fn guest_monitor_interval(&self) -> Duration {
        seconds(self.guest_monitor_interval)
    }

    pub fn policy_engine_interval(&self) -> Duration {
        seconds(self.policy_engine_interval)
    }
}

impl ShutdownConfig {
    pub fn policy_engine_timeout(&self) -> Duration {
        seconds(self.policy_engine)
    }

    pub fn guest_manager_timeout(&self) -> Duration {
        seconds(self.guest_manager)
    }

    pub fn host_monitor_timeout(&self) -> Duration {
        seconds(self.host_monitor)
    }

    pub fn guest_monitor_timeout(&self) -> Duration {
        seconds(self.guest_monitor)
    }
}
