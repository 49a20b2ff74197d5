// Memory Overcommitment Manager
// Host and guest monitoring driven by a policy control loop
pub mod collectors;
pub mod config;
pub mod controllers;
pub mod entity;
pub mod error;
pub mod guest_manager;
pub mod hypervisor;
pub mod logging;
pub mod monitor;
pub mod plotter;
pub mod policy_engine;
pub mod registry;
pub mod shutdown;
pub mod supervisor;
pub mod worker;

// Re-export the pieces an embedding program wires together.
pub use collectors::{Collector, CollectorError};
pub use config::{ConfigError, MomConfig};
pub use controllers::{Controller, ControllerError};
pub use entity::{Entity, Properties, Sample};
pub use error::MomError;
pub use guest_manager::GuestManager;
pub use hypervisor::{GuestId, GuestInfo, Hypervisor, HypervisorError};
pub use monitor::{Monitor, Readiness};
pub use policy_engine::{PolicyEngine, TickOutcome};
pub use registry::{PluginError, PluginRegistry, Plugins};
pub use shutdown::ShutdownToken;
pub use supervisor::{Mom, MomHandle, Statistics};
pub use worker::{Health, Heartbeat, Worker};
