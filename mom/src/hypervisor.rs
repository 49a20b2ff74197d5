//! Hypervisor capability
//!
//! Lists running guests and describes them. The memory-stat, balloon and KSM
//! operations are used by collectors and controllers; an interface that
//! cannot perform one reports `Unsupported`.

use crate::config::MomConfig;
use crate::entity::Sample;
use indexmap::IndexMap;
use mom_policy::Value;
use std::sync::Arc;
use thiserror::Error;

/// Hypervisor-assigned guest identifier.
pub type GuestId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestInfo {
    pub uuid: String,
    pub name: String,
    pub pid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalloonInfo {
    /// Maximum memory the guest may use (KiB)
    pub balloon_max: u64,
    /// Current memory limit set by ballooning (KiB)
    pub balloon_cur: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HypervisorError {
    #[error("guest {0} not found")]
    GuestNotFound(GuestId),

    #[error("{0} is not supported by this hypervisor interface")]
    Unsupported(&'static str),

    #[error("hypervisor error: {0}")]
    Failed(String),
}

pub trait Hypervisor: Send + Sync {
    /// Identifiers of the running guests. An error or an empty list means
    /// the answer is unknown this time.
    fn list_active_guests(&self) -> Result<Vec<GuestId>, HypervisorError>;

    fn guest_info(&self, id: &GuestId) -> Result<GuestInfo, HypervisorError>;

    fn memory_stats(&self, _id: &GuestId) -> Result<Sample, HypervisorError> {
        Err(HypervisorError::Unsupported("memory_stats"))
    }

    fn balloon_info(&self, _id: &GuestId) -> Result<BalloonInfo, HypervisorError> {
        Err(HypervisorError::Unsupported("balloon_info"))
    }

    /// Resizes the guest balloon to `target` KiB.
    fn set_balloon_target(&self, _id: &GuestId, _target: u64) -> Result<(), HypervisorError> {
        Err(HypervisorError::Unsupported("set_balloon_target"))
    }

    /// Applies KSM tuning parameters (`run`, `pages_to_scan`,
    /// `sleep_millisecs`, ...).
    fn ksm_tune(&self, _params: &IndexMap<String, Value>) -> Result<(), HypervisorError> {
        Err(HypervisorError::Unsupported("ksm_tune"))
    }
}

pub type HypervisorFactory =
    Arc<dyn Fn(&MomConfig) -> Result<Arc<dyn Hypervisor>, HypervisorError> + Send + Sync>;

/// Wraps a closure as a registry entry.
pub fn factory<F>(f: F) -> HypervisorFactory
where
    F: Fn(&MomConfig) -> Result<Arc<dyn Hypervisor>, HypervisorError> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ListOnly;

    impl Hypervisor for ListOnly {
        fn list_active_guests(&self) -> Result<Vec<GuestId>, HypervisorError> {
            Ok(vec!["7".to_string()])
        }

        fn guest_info(&self, id: &GuestId) -> Result<GuestInfo, HypervisorError> {
            Err(HypervisorError::GuestNotFound(id.clone()))
        }
    }

    #[test]
    fn actuators_default_to_unsupported() {
        let hv = ListOnly;
        let id = "7".to_string();
        assert_eq!(
            hv.memory_stats(&id),
            Err(HypervisorError::Unsupported("memory_stats"))
        );
        assert_eq!(
            hv.balloon_info(&id),
            Err(HypervisorError::Unsupported("balloon_info"))
        );
        assert_eq!(
            hv.set_balloon_target(&id, 1024),
            Err(HypervisorError::Unsupported("set_balloon_target"))
        );
        assert_eq!(
            hv.ksm_tune(&IndexMap::new()),
            Err(HypervisorError::Unsupported("ksm_tune"))
        );
        assert_eq!(
            hv.guest_info(&id).unwrap_err().to_string(),
            "guest 7 not found"
        );
    }

    #[test]
    fn factories_build_shared_interfaces() {
        let make = factory(|_| Ok(Arc::new(ListOnly) as Arc<dyn Hypervisor>));
        let hv = make(&MomConfig::default()).unwrap();
        assert_eq!(hv.list_active_guests().unwrap(), vec!["7".to_string()]);
    }
}
