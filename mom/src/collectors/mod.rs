//! Collector capability
//!
//! A collector contributes a fixed set of statistics to a Monitor every
//! cycle. Concrete collectors (reading `/proc`, asking the hypervisor, ...)
//! are registered by the embedding program under the names used in the
//! configuration.

use crate::config::MomConfig;
use crate::entity::{Properties, Sample};
use crate::registry::{PluginError, PluginRegistry};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectorError {
    /// This cycle's data is unusable; try again next cycle.
    #[error("collection error: {0}")]
    Collection(String),

    /// The collector can never produce data again.
    #[error("fatal collector error: {0}")]
    Fatal(String),
}

pub trait Collector: Send {
    /// Gathers one set of statistics.
    fn collect(&mut self) -> Result<Sample, CollectorError>;

    /// Names of every statistic `collect` promises to return.
    fn fields(&self) -> BTreeSet<String>;
}

/// What a collector factory gets to know about its Monitor.
pub struct CollectorContext<'a> {
    pub properties: &'a Properties,
    pub config: &'a MomConfig,
}

pub type CollectorFactory =
    Arc<dyn Fn(&CollectorContext<'_>) -> Result<Box<dyn Collector>, CollectorError> + Send + Sync>;

/// Wraps a closure as a registry entry.
pub fn factory<F>(f: F) -> CollectorFactory
where
    F: Fn(&CollectorContext<'_>) -> Result<Box<dyn Collector>, CollectorError> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Error)]
pub enum CollectorSetupError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("collector {name} failed to initialize: {source}")]
    Init {
        name: String,
        #[source]
        source: CollectorError,
    },
}

/// Instantiates the named collectors in order. Any unknown name or failing
/// factory fails the whole set.
pub fn get_collectors(
    names: &[String],
    registry: &PluginRegistry<CollectorFactory>,
    context: &CollectorContext<'_>,
) -> Result<Vec<Box<dyn Collector>>, CollectorSetupError> {
    let mut collectors = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let make = registry.get(name)?;
        let collector = make(context).map_err(|source| CollectorSetupError::Init {
            name: name.to_string(),
            source,
        })?;
        collectors.push(collector);
    }
    Ok(collectors)
}
