// Scripted in-memory fakes shared by the integration tests
#![allow(dead_code)]

use indexmap::IndexMap;
use mom::collectors::{self, Collector, CollectorError};
use mom::controllers::{self, Controller, ControllerError};
use mom::hypervisor::{self, GuestId, GuestInfo, Hypervisor, HypervisorError};
use mom::{Entity, MomConfig, Plugins, Sample};
use mom_policy::Value;
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub fn sample(pairs: &[(&str, i64)]) -> Sample {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::Integer(*v)))
        .collect()
}

/// Polls `condition` every few milliseconds until it holds or `timeout`
/// passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Replays a script of results, then repeats `fallback` forever.
pub struct ScriptedCollector {
    fields: BTreeSet<String>,
    script: VecDeque<Result<Sample, CollectorError>>,
    fallback: Result<Sample, CollectorError>,
}

impl ScriptedCollector {
    pub fn new(
        fields: &[&str],
        script: Vec<Result<Sample, CollectorError>>,
        fallback: Result<Sample, CollectorError>,
    ) -> Box<dyn Collector> {
        Box::new(ScriptedCollector {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            script: script.into(),
            fallback,
        })
    }
}

impl Collector for ScriptedCollector {
    fn collect(&mut self) -> Result<Sample, CollectorError> {
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn fields(&self) -> BTreeSet<String> {
        self.fields.clone()
    }
}

/// Reports `seq` and `mirror`, both equal to a counter that increases by one
/// every cycle.
pub struct CountingCollector {
    counter: Arc<AtomicI64>,
}

impl CountingCollector {
    pub fn new(counter: Arc<AtomicI64>) -> Box<dyn Collector> {
        Box::new(CountingCollector { counter })
    }
}

impl Collector for CountingCollector {
    fn collect(&mut self) -> Result<Sample, CollectorError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(sample(&[("seq", n), ("mirror", n)]))
    }

    fn fields(&self) -> BTreeSet<String> {
        BTreeSet::from(["seq".to_string(), "mirror".to_string()])
    }
}

/// Hypervisor whose guest list the test sets directly.
#[derive(Default)]
pub struct FakeHypervisor {
    guests: Mutex<Vec<GuestId>>,
    listing_fails: Mutex<bool>,
    pub balloon_calls: Mutex<Vec<(GuestId, u64)>>,
    pub ksm_calls: Mutex<Vec<IndexMap<String, Value>>>,
}

impl FakeHypervisor {
    pub fn with_guests(ids: &[&str]) -> Arc<Self> {
        let hv = Arc::new(FakeHypervisor::default());
        hv.set_guests(ids);
        hv
    }

    pub fn set_guests(&self, ids: &[&str]) {
        *self.guests.lock().unwrap() = ids.iter().map(|id| id.to_string()).collect();
    }

    pub fn fail_listing(&self, fail: bool) {
        *self.listing_fails.lock().unwrap() = fail;
    }
}

impl Hypervisor for FakeHypervisor {
    fn list_active_guests(&self) -> Result<Vec<GuestId>, HypervisorError> {
        if *self.listing_fails.lock().unwrap() {
            return Err(HypervisorError::Failed("connection lost".to_string()));
        }
        Ok(self.guests.lock().unwrap().clone())
    }

    fn guest_info(&self, id: &GuestId) -> Result<GuestInfo, HypervisorError> {
        if !self.guests.lock().unwrap().contains(id) {
            return Err(HypervisorError::GuestNotFound(id.clone()));
        }
        Ok(GuestInfo {
            uuid: format!("uuid-{}", id),
            name: format!("vm{}", id),
            pid: 1000,
        })
    }

    fn set_balloon_target(&self, id: &GuestId, target: u64) -> Result<(), HypervisorError> {
        self.balloon_calls.lock().unwrap().push((id.clone(), target));
        Ok(())
    }

    fn ksm_tune(&self, params: &IndexMap<String, Value>) -> Result<(), HypervisorError> {
        self.ksm_calls.lock().unwrap().push(params.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Records the guest count of every call.
pub struct RecordingController {
    pub calls: Arc<Mutex<Vec<usize>>>,
    pub behavior: Behavior,
}

impl Controller for RecordingController {
    fn process(&mut self, _host: &Entity, guests: &[Arc<Entity>]) -> Result<(), ControllerError> {
        self.calls.lock().unwrap().push(guests.len());
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ControllerError::Failed("actuator offline".to_string())),
            Behavior::Panic => panic!("controller bug"),
        }
    }
}

/// Configuration with short intervals and the `Mem` collector everywhere.
pub fn fast_config() -> MomConfig {
    let mut config = MomConfig::default();
    config.main.main_loop_interval = 0.02;
    config.main.host_monitor_interval = 0.01;
    config.main.guest_manager_interval = 0.01;
    config.main.guest_monitor_interval = 0.01;
    config.main.policy_engine_interval = 0.02;
    config.main.hypervisor_interface = "fake".to_string();
    config.main.controllers = vec!["Recorder".to_string()];
    config.host.collectors = vec!["Mem".to_string()];
    config.guest.collectors = vec!["Mem".to_string()];
    config.shutdown.policy_engine = 2.0;
    config.shutdown.guest_manager = 2.0;
    config.shutdown.host_monitor = 2.0;
    config.shutdown.guest_monitor = 2.0;
    config
}

/// Plugins with the `Mem` collector, the `fake` hypervisor and a
/// `Recorder` controller writing into `calls`.
pub fn fake_plugins(hv: Arc<FakeHypervisor>, calls: Arc<Mutex<Vec<usize>>>) -> Plugins {
    let mut plugins = Plugins::with_defaults();
    plugins.collectors.register(
        "Mem",
        collectors::factory(|_| {
            Ok(ScriptedCollector::new(
                &["mem_free", "mem_total"],
                vec![],
                Ok(sample(&[("mem_free", 512), ("mem_total", 2048)])),
            ))
        }),
    );
    plugins.hypervisors.register(
        "fake",
        hypervisor::factory(move |_| Ok(hv.clone() as Arc<dyn Hypervisor>)),
    );
    plugins.controllers.register(
        "Recorder",
        controllers::factory(move |_| {
            Ok(Box::new(RecordingController {
                calls: calls.clone(),
                behavior: Behavior::Succeed,
            }) as Box<dyn Controller>)
        }),
    );
    plugins
}
