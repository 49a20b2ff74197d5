//! Applies `balloon_target` controls by resizing guest balloons.

use super::{control_as_i64, Controller, ControllerError};
use crate::entity::Entity;
use crate::hypervisor::Hypervisor;
use mom_policy::Value;
use std::sync::Arc;

pub struct Balloon {
    hypervisor: Arc<dyn Hypervisor>,
}

impl Balloon {
    pub fn new(hypervisor: Arc<dyn Hypervisor>) -> Self {
        Balloon { hypervisor }
    }

    fn adjust(&self, guest: &Entity, target: &Value) -> Result<(), ControllerError> {
        let target = control_as_i64("balloon_target", target)?;
        let target = u64::try_from(target).map_err(|_| ControllerError::InvalidControl {
            name: "balloon_target".to_string(),
            value: target.to_string(),
            reason: "negative".to_string(),
        })?;
        let id = match guest.property("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(ControllerError::Failed(format!(
                    "{} has no id property",
                    guest.name()
                )))
            }
        };
        let previous = guest
            .stat("libvirt_curmem")
            .map(Value::to_string)
            .unwrap_or_else(|| "?".to_string());
        log::info!(
            "Ballooning guest:{} from {} to {}",
            guest.property("name").map(Value::to_string).unwrap_or_else(|| id.clone()),
            previous,
            target
        );
        self.hypervisor.set_balloon_target(&id, target)?;
        Ok(())
    }
}

impl Controller for Balloon {
    /// Every guest is attempted; the first failure is reported afterwards.
    fn process(&mut self, _host: &Entity, guests: &[Arc<Entity>]) -> Result<(), ControllerError> {
        let mut first_error = None;
        for guest in guests {
            let Some(target) = guest.control("balloon_target") else {
                continue;
            };
            if let Err(e) = self.adjust(guest, &target) {
                log::warn!("Balloon adjustment of {} failed: {}", guest.name(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::RecordingHypervisor;
    use crate::entity::{Properties, Sample};

    fn guest(id: &str, curmem: i64) -> Arc<Entity> {
        let mut props = Properties::new();
        props.insert("id".to_string(), Value::from(id));
        props.insert("name".to_string(), Value::from(format!("vm-{}", id)));
        let sample = Sample::from([("libvirt_curmem".to_string(), Value::Integer(curmem))]);
        Arc::new(Entity::detached(format!("GuestMonitor-vm-{}", id), props, vec![sample]))
    }

    #[test]
    fn only_guests_with_targets_are_resized() {
        let hv = Arc::new(RecordingHypervisor::default());
        let mut balloon = Balloon::new(hv.clone());
        let host = Entity::detached("host", Properties::new(), vec![]);
        let (a, b, c) = (guest("1", 2048), guest("2", 2048), guest("3", 4096));
        a.set_control("balloon_target", Value::Integer(1024));
        c.set_control("balloon_target", Value::Float(3000.7));

        balloon.process(&host, &[a, b, c]).unwrap();
        assert_eq!(
            *hv.balloon_calls.lock().unwrap(),
            vec![("1".to_string(), 1024), ("3".to_string(), 3000)]
        );
    }

    #[test]
    fn failures_do_not_stop_other_guests() {
        let hv = Arc::new(RecordingHypervisor {
            fail_guest: Some("1".to_string()),
            ..Default::default()
        });
        let mut balloon = Balloon::new(hv.clone());
        let host = Entity::detached("host", Properties::new(), vec![]);
        let (a, b, c) = (guest("1", 2048), guest("2", 2048), guest("3", 2048));
        a.set_control("balloon_target", Value::Integer(1024));
        b.set_control("balloon_target", Value::Integer(-5));
        c.set_control("balloon_target", Value::Integer(512));

        let err = balloon.process(&host, &[a, b, c]).unwrap_err();
        assert!(matches!(err, ControllerError::Hypervisor(_)));
        assert_eq!(*hv.balloon_calls.lock().unwrap(), vec![("3".to_string(), 512)]);
    }
}
