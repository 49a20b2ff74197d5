//! Controller capability
//!
//! Controllers act on the controls a policy set on the Host and Guest
//! entities during a tick. `Balloon` and `KSM` are built in; both drive the
//! hypervisor interface.

pub mod balloon;
pub mod ksm;

use crate::config::MomConfig;
use crate::entity::Entity;
use crate::hypervisor::{Hypervisor, HypervisorError};
use crate::registry::PluginRegistry;
use mom_policy::Value;
use std::sync::Arc;
use thiserror::Error;

pub use balloon::Balloon;
pub use ksm::Ksm;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Hypervisor(#[from] HypervisorError),

    #[error("control {name} has unusable value {value}: {reason}")]
    InvalidControl {
        name: String,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Failed(String),
}

pub trait Controller: Send {
    /// Applies the controls of one tick. Only entities from a successful
    /// policy evaluation are passed in.
    fn process(&mut self, host: &Entity, guests: &[Arc<Entity>]) -> Result<(), ControllerError>;
}

/// Collaborators available to controller factories.
pub struct ControllerContext<'a> {
    pub hypervisor: Arc<dyn Hypervisor>,
    pub config: &'a MomConfig,
}

pub type ControllerFactory = Arc<
    dyn Fn(&ControllerContext<'_>) -> Result<Box<dyn Controller>, ControllerError> + Send + Sync,
>;

/// Wraps a closure as a registry entry.
pub fn factory<F>(f: F) -> ControllerFactory
where
    F: Fn(&ControllerContext<'_>) -> Result<Box<dyn Controller>, ControllerError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

pub fn register_builtin(registry: &mut PluginRegistry<ControllerFactory>) {
    registry.register(
        "Balloon",
        factory(|ctx| Ok(Box::new(Balloon::new(ctx.hypervisor.clone())) as Box<dyn Controller>)),
    );
    registry.register(
        "KSM",
        factory(|ctx| Ok(Box::new(Ksm::new(ctx.hypervisor.clone())) as Box<dyn Controller>)),
    );
}

/// A controller together with the name it was configured under.
pub struct NamedController {
    pub name: String,
    pub controller: Box<dyn Controller>,
}

/// Instantiates the configured controllers in order. Unknown names and
/// failing factories are logged and skipped.
pub fn load_controllers(
    names: &[String],
    registry: &PluginRegistry<ControllerFactory>,
    context: &ControllerContext<'_>,
) -> Vec<NamedController> {
    let mut controllers = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let make = match registry.get(name) {
            Ok(make) => make,
            Err(e) => {
                log::warn!("Unable to load controller {}: {}", name, e);
                continue;
            }
        };
        match make(context) {
            Ok(controller) => {
                log::debug!("Loaded {} controller", name);
                controllers.push(NamedController {
                    name: name.to_string(),
                    controller,
                });
            }
            Err(e) => log::warn!("Controller {} failed to initialize: {}", name, e),
        }
    }
    controllers
}

/// Reads an integer control value. Floats are truncated and numeric strings
/// are parsed.
pub(crate) fn control_as_i64(name: &str, value: &Value) -> Result<i64, ControllerError> {
    let invalid = |reason: &str| ControllerError::InvalidControl {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Boolean(b) => Ok(*b as i64),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        Value::String(s) => s.trim().parse().map_err(|_| invalid("not an integer")),
        _ => Err(invalid("not a number")),
    }
}
