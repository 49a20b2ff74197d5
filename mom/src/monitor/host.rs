//! The host Monitor.

use super::Monitor;
use crate::collectors::{get_collectors, CollectorContext, CollectorFactory, CollectorSetupError};
use crate::config::MomConfig;
use crate::entity::Properties;
use crate::registry::PluginRegistry;
use std::path::Path;

pub const HOST_MONITOR_NAME: &str = "HostMonitor";

/// Builds the host Monitor from the `[host]` collector list.
pub fn create_host_monitor(
    config: &MomConfig,
    collectors: &PluginRegistry<CollectorFactory>,
    plot_session: Option<&Path>,
) -> Result<Monitor, CollectorSetupError> {
    let properties = Properties::new();
    let context = CollectorContext {
        properties: &properties,
        config,
    };
    let collectors = get_collectors(&config.host.collectors, collectors, &context)
        .map_err(|e| {
            log::error!("Host Monitor initialization failed: {}", e);
            e
        })?;
    Ok(Monitor::new(
        HOST_MONITOR_NAME,
        properties,
        collectors,
        config.main.sample_history_length,
        plot_session,
    ))
}
