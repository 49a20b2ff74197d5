//! Applies `ksm_*` host controls to the kernel samepage merging tunables.

use super::{control_as_i64, Controller, ControllerError};
use crate::entity::Entity;
use crate::hypervisor::Hypervisor;
use indexmap::IndexMap;
use mom_policy::Value;
use std::sync::Arc;

const TUNABLES: [&str; 3] = ["run", "pages_to_scan", "sleep_millisecs"];

pub struct Ksm {
    hypervisor: Arc<dyn Hypervisor>,
    /// Last values applied successfully.
    current: IndexMap<String, i64>,
}

impl Ksm {
    pub fn new(hypervisor: Arc<dyn Hypervisor>) -> Self {
        Ksm {
            hypervisor,
            current: IndexMap::new(),
        }
    }
}

impl Controller for Ksm {
    fn process(&mut self, host: &Entity, _guests: &[Arc<Entity>]) -> Result<(), ControllerError> {
        let mut changed: IndexMap<String, i64> = IndexMap::new();
        for key in TUNABLES {
            let control = format!("ksm_{}", key);
            let Some(value) = host.control(&control) else {
                continue;
            };
            let value = control_as_i64(&control, &value)?;
            if self.current.get(key) != Some(&value) {
                changed.insert(key.to_string(), value);
            }
        }
        if changed.is_empty() {
            return Ok(());
        }

        let summary: Vec<String> = changed.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
        log::info!("Updating KSM configuration: {}", summary.join(" "));
        let params = changed
            .iter()
            .map(|(k, v)| (k.clone(), Value::Integer(*v)))
            .collect();
        self.hypervisor.ksm_tune(&params)?;
        self.current.extend(changed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::RecordingHypervisor;
    use crate::entity::Properties;

    fn host_with(controls: &[(&str, i64)]) -> Entity {
        let host = Entity::detached("host", Properties::new(), vec![]);
        for (name, value) in controls {
            host.set_control(name, Value::Integer(*value));
        }
        host
    }

    #[test]
    fn only_changed_tunables_are_written() {
        let hv = Arc::new(RecordingHypervisor::default());
        let mut ksm = Ksm::new(hv.clone());

        ksm.process(&host_with(&[("ksm_run", 1), ("ksm_pages_to_scan", 64)]), &[])
            .unwrap();
        ksm.process(&host_with(&[("ksm_run", 1), ("ksm_pages_to_scan", 128)]), &[])
            .unwrap();
        ksm.process(&host_with(&[("ksm_run", 1)]), &[]).unwrap();

        let calls = hv.ksm_calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].get("run"), Some(&Value::Integer(1)));
        assert_eq!(calls[0].get("pages_to_scan"), Some(&Value::Integer(64)));
        assert_eq!(calls[1].len(), 1);
        assert_eq!(calls[1].get("pages_to_scan"), Some(&Value::Integer(128)));
    }

    #[test]
    fn unsupported_hypervisor_is_an_error() {
        struct Bare;
        impl Hypervisor for Bare {
            fn list_active_guests(
                &self,
            ) -> Result<Vec<String>, crate::hypervisor::HypervisorError> {
                Ok(vec![])
            }
            fn guest_info(
                &self,
                id: &String,
            ) -> Result<crate::hypervisor::GuestInfo, crate::hypervisor::HypervisorError> {
                Err(crate::hypervisor::HypervisorError::GuestNotFound(id.clone()))
            }
        }
        let mut ksm = Ksm::new(Arc::new(Bare));
        let host = host_with(&[("ksm_run", 0)]);
        assert!(matches!(
            ksm.process(&host, &[]),
            Err(ControllerError::Hypervisor(_))
        ));
        // Not recorded as applied, so the next tick retries.
        assert!(ksm.process(&host, &[]).is_err());
    }
}
