//! Point-in-time snapshots of monitored objects, as seen by policies.

use crate::monitor::Monitor;
use crate::shutdown::lock;
use indexmap::IndexMap;
use mom_policy::runtime::{HostObject, RuntimeError, RuntimeResult, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, Weak};

/// One collection cycle's merged statistics.
pub type Sample = BTreeMap<String, Value>;

/// Relatively static facts about a monitored object (name, id, ...).
pub type Properties = IndexMap<String, Value>;

/// Snapshot of a Monitor handed to the policy and then to controllers.
///
/// Properties and statistics are frozen copies. Variables start as the
/// monitor's persisted variables and may be changed by the policy; they are
/// written back with [`Entity::store_variables`]. Controls are actuator
/// outputs for the current tick only.
#[derive(Debug)]
pub struct Entity {
    name: String,
    properties: Properties,
    statistics: Vec<Sample>,
    variables: Mutex<IndexMap<String, Value>>,
    controls: Mutex<IndexMap<String, Value>>,
    monitor: Weak<Monitor>,
}

impl Entity {
    pub fn new(
        name: impl Into<String>,
        properties: Properties,
        statistics: Vec<Sample>,
        variables: IndexMap<String, Value>,
        monitor: Weak<Monitor>,
    ) -> Self {
        Entity {
            name: name.into(),
            properties,
            statistics,
            variables: Mutex::new(variables),
            controls: Mutex::new(IndexMap::new()),
            monitor,
        }
    }

    /// An entity with no owning monitor. Variables are never persisted.
    pub fn detached(name: impl Into<String>, properties: Properties, statistics: Vec<Sample>) -> Self {
        Self::new(name, properties, statistics, IndexMap::new(), Weak::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Stored samples, oldest first.
    pub fn statistics(&self) -> &[Sample] {
        &self.statistics
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.statistics.last()
    }

    /// Newest value of a statistic.
    pub fn stat(&self, name: &str) -> Option<&Value> {
        self.latest().and_then(|sample| sample.get(name))
    }

    /// Mean of a statistic over the whole history.
    pub fn stat_avg(&self, name: &str) -> RuntimeResult<f64> {
        if self.statistics.is_empty() {
            return Err(self.error(format!("statistic '{}' not available", name)));
        }
        let mut total = 0.0;
        for sample in &self.statistics {
            let value = sample
                .get(name)
                .ok_or_else(|| self.error(format!("statistic '{}' not available", name)))?;
            total += value.as_f64().ok_or_else(|| {
                RuntimeError::type_error("number", value.type_name(), "StatAvg")
            })?;
        }
        Ok(total / self.statistics.len() as f64)
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        lock(&self.variables).get(name).cloned()
    }

    pub fn set_variable(&self, name: &str, value: Value) {
        lock(&self.variables).insert(name.to_string(), value);
    }

    pub fn control(&self, name: &str) -> Option<Value> {
        lock(&self.controls).get(name).cloned()
    }

    pub fn set_control(&self, name: &str, value: Value) {
        lock(&self.controls).insert(name.to_string(), value);
    }

    pub fn controls(&self) -> IndexMap<String, Value> {
        lock(&self.controls).clone()
    }

    /// Writes the variables back into the owning monitor so the next
    /// snapshot starts from them.
    pub fn store_variables(&self) {
        if let Some(monitor) = self.monitor.upgrade() {
            let variables = lock(&self.variables).clone();
            monitor.update_variables(variables);
        }
    }

    fn error(&self, message: String) -> RuntimeError {
        RuntimeError::HostError {
            object: self.name.clone(),
            message,
        }
    }
}

fn name_arg(method: &str, args: &[Value], index: usize) -> RuntimeResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RuntimeError::type_error("string", other.type_name(), method)),
        None => Err(RuntimeError::arity(method, index + 1, args.len())),
    }
}

fn expect_args(method: &str, args: &[Value], count: usize) -> RuntimeResult<()> {
    if args.len() == count {
        Ok(())
    } else {
        Err(RuntimeError::arity(method, count, args.len()))
    }
}

impl HostObject for Entity {
    fn type_name(&self) -> &str {
        "Entity"
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.stat(name).or_else(|| self.property(name)).cloned()
    }

    fn call_method(&self, method: &str, args: Vec<Value>) -> RuntimeResult<Value> {
        match method {
            "Prop" => {
                expect_args(method, &args, 1)?;
                let name = name_arg(method, &args, 0)?;
                self.property(&name)
                    .cloned()
                    .ok_or_else(|| self.error(format!("no property '{}'", name)))
            }
            "Stat" => {
                expect_args(method, &args, 1)?;
                let name = name_arg(method, &args, 0)?;
                match self.latest() {
                    None => Ok(Value::Nil),
                    Some(sample) => sample
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| self.error(format!("no statistic '{}'", name))),
                }
            }
            "StatAvg" => {
                expect_args(method, &args, 1)?;
                let name = name_arg(method, &args, 0)?;
                self.stat_avg(&name).map(Value::Float)
            }
            "SetVar" => {
                expect_args(method, &args, 2)?;
                let name = name_arg(method, &args, 0)?;
                let value = args[1].clone();
                self.set_variable(&name, value.clone());
                Ok(value)
            }
            "GetVar" => {
                expect_args(method, &args, 1)?;
                let name = name_arg(method, &args, 0)?;
                Ok(self.variable(&name).unwrap_or(Value::Nil))
            }
            "Control" => {
                expect_args(method, &args, 2)?;
                let name = name_arg(method, &args, 0)?;
                let value = args[1].clone();
                self.set_control(&name, value.clone());
                Ok(value)
            }
            "GetControl" => {
                expect_args(method, &args, 1)?;
                let name = name_arg(method, &args, 0)?;
                Ok(self.control(&name).unwrap_or(Value::Nil))
            }
            _ => Err(RuntimeError::UnknownMethod {
                object: self.name.clone(),
                method: method.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mom_policy::Policy;
    use std::sync::Arc;

    fn sample(free: i64, total: i64) -> Sample {
        let mut s = Sample::new();
        s.insert("mem_free".to_string(), Value::Integer(free));
        s.insert("mem_total".to_string(), Value::Integer(total));
        s
    }

    fn host() -> Arc<Entity> {
        let mut props = Properties::new();
        props.insert("name".to_string(), Value::from("host"));
        Arc::new(Entity::detached(
            "host",
            props,
            vec![sample(100, 1000), sample(300, 1000)],
        ))
    }

    fn run(policy: &str, entity: &Arc<Entity>) -> Vec<Value> {
        Policy::parse(policy)
            .unwrap()
            .evaluate(&[("Host", Value::Object(entity.clone()))])
            .unwrap()
    }

    #[test]
    fn newest_sample_fields_are_attributes() {
        let host = host();
        assert_eq!(
            run("Host.mem_free (Host.Stat \"mem_total\") Host.name", &host),
            vec![Value::Integer(300), Value::Integer(1000), Value::from("host")]
        );
    }

    #[test]
    fn stat_avg_is_a_float_mean() {
        let host = host();
        assert_eq!(
            run("(Host.StatAvg \"mem_free\")", &host),
            vec![Value::Float(200.0)]
        );
        let empty = Arc::new(Entity::detached("empty", Properties::new(), vec![]));
        let result = Policy::parse("(Host.StatAvg \"mem_free\")")
            .unwrap()
            .evaluate(&[("Host", Value::Object(empty.clone()))]);
        assert!(result.is_err());
        assert_eq!(run("(Host.Stat \"mem_free\")", &empty), vec![Value::Nil]);
    }

    #[test]
    fn variables_and_controls() {
        let host = host();
        let results = run(
            r#"(Host.GetVar "last") (Host.SetVar "last" 5) (Host.GetVar "last")
               (Host.Control "balloon_target" 1024) (Host.GetControl "ksm_run")"#,
            &host,
        );
        assert_eq!(
            results,
            vec![
                Value::Nil,
                Value::Integer(5),
                Value::Integer(5),
                Value::Integer(1024),
                Value::Nil
            ]
        );
        assert_eq!(host.variable("last"), Some(Value::Integer(5)));
        assert_eq!(host.control("balloon_target"), Some(Value::Integer(1024)));
    }

    #[test]
    fn bad_method_calls() {
        let host = host();
        assert!(matches!(
            host.call_method("Explode", vec![]),
            Err(RuntimeError::UnknownMethod { .. })
        ));
        assert!(matches!(
            host.call_method("Prop", vec![]),
            Err(RuntimeError::ArityMismatch { .. })
        ));
        assert!(matches!(
            host.call_method("Prop", vec![Value::Integer(1)]),
            Err(RuntimeError::TypeError { .. })
        ));
        assert!(matches!(
            host.call_method("Prop", vec![Value::from("missing")]),
            Err(RuntimeError::HostError { .. })
        ));
    }
}
