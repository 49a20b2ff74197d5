//! Guest Monitors, one per running guest.

use super::Monitor;
use crate::collectors::{get_collectors, CollectorContext, CollectorFactory, CollectorSetupError};
use crate::config::MomConfig;
use crate::entity::Properties;
use crate::hypervisor::{GuestId, Hypervisor, HypervisorError};
use crate::registry::PluginRegistry;
use mom_policy::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuestMonitorError {
    #[error("cannot describe guest: {0}")]
    Info(#[from] HypervisorError),

    #[error(transparent)]
    Collectors(#[from] CollectorSetupError),
}

/// Builds the Monitor for guest `id`. Its properties are `id`, `uuid`,
/// `name` and `pid`, all visible to the guest collectors.
pub fn create_guest_monitor(
    id: &GuestId,
    hypervisor: &dyn Hypervisor,
    config: &MomConfig,
    collectors: &PluginRegistry<CollectorFactory>,
    plot_session: Option<&Path>,
) -> Result<Monitor, GuestMonitorError> {
    let info = hypervisor.guest_info(id).map_err(|e| {
        log::error!("Failed to get guest:{} information -- monitor can't start: {}", id, e);
        e
    })?;
    let name = format!("GuestMonitor-{}", info.name);

    let mut properties = Properties::new();
    properties.insert("id".to_string(), Value::from(id.as_str()));
    properties.insert("uuid".to_string(), Value::from(info.uuid));
    properties.insert("name".to_string(), Value::from(info.name));
    properties.insert("pid".to_string(), Value::Integer(i64::from(info.pid)));

    let context = CollectorContext {
        properties: &properties,
        config,
    };
    let collectors = get_collectors(&config.guest.collectors, collectors, &context)
        .map_err(|e| {
            log::error!("Guest Monitor initialization failed: {}", e);
            e
        })?;
    Ok(Monitor::new(
        name,
        properties,
        collectors,
        config.main.sample_history_length,
        plot_session,
    ))
}
