//! Monitors own the live state of one monitored object
//!
//! Every cycle a Monitor merges the output of its collectors into one sample,
//! keeps a bounded history of complete samples and tracks whether the data
//! is complete enough to hand out as an [`Entity`] snapshot.

pub mod guest;
pub mod host;

use crate::collectors::{Collector, CollectorError};
use crate::entity::{Entity, Properties, Sample};
use crate::plotter::Plotter;
use crate::shutdown::{lock, ShutdownToken};
use crate::worker::Worker;
use indexmap::IndexMap;
use mom_policy::Value;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use guest::{create_guest_monitor, GuestMonitorError};
pub use host::{create_host_monitor, HOST_MONITOR_NAME};

/// Plot output of one Monitor. The file is opened on the first stored
/// sample, so a Monitor that never runs leaves no trace in the session.
enum PlotTarget {
    Off,
    Pending(PathBuf),
    Open(Plotter),
}

/// Opens `<session>/<name>.dat` and writes its header.
fn open_plotter(session: &Path, name: &str, fields: &BTreeSet<String>) -> PlotTarget {
    let opened = Plotter::open(session, name).and_then(|mut plotter| {
        plotter.set_fields(fields)?;
        Ok(plotter)
    });
    match opened {
        Ok(plotter) => PlotTarget::Open(plotter),
        Err(e) => {
            log::warn!("{}: plotting disabled: {}", name, e);
            PlotTarget::Off
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No cycle has completed yet
    Unknown,
    /// The newest sample carried every expected field
    Ready,
    /// The newest cycle was incomplete
    NotReady,
    /// A collector failed permanently; no further cycles run
    Terminated,
}

struct MonitorData {
    properties: Properties,
    statistics: VecDeque<Sample>,
    variables: IndexMap<String, Value>,
    readiness: Readiness,
}

pub struct Monitor {
    name: String,
    data: Mutex<MonitorData>,
    fields: BTreeSet<String>,
    collectors: Mutex<Vec<Box<dyn Collector>>>,
    history_length: usize,
    plot: Mutex<PlotTarget>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("name", &self.name)
            .field("readiness", &self.readiness())
            .field("fields", &self.fields)
            .finish()
    }
}

impl Monitor {
    /// The expected field set is the union of every collector's fields.
    pub fn new(
        name: impl Into<String>,
        properties: Properties,
        collectors: Vec<Box<dyn Collector>>,
        history_length: usize,
        plot_session: Option<&Path>,
    ) -> Self {
        let name = name.into();
        let fields: BTreeSet<String> = collectors.iter().flat_map(|c| c.fields()).collect();
        log::debug!("{} using fields: {:?}", name, fields);

        let plot = match plot_session {
            Some(session) => PlotTarget::Pending(session.to_path_buf()),
            None => PlotTarget::Off,
        };

        Monitor {
            name,
            data: Mutex::new(MonitorData {
                properties,
                statistics: VecDeque::with_capacity(history_length),
                variables: IndexMap::new(),
                readiness: Readiness::Unknown,
            }),
            fields,
            collectors: Mutex::new(collectors),
            history_length: history_length.max(1),
            plot: Mutex::new(plot),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn readiness(&self) -> Readiness {
        lock(&self.data).readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    pub fn is_terminated(&self) -> bool {
        self.readiness() == Readiness::Terminated
    }

    pub fn properties(&self) -> Properties {
        lock(&self.data).properties.clone()
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        lock(&self.data).properties.get(name).cloned()
    }

    pub fn latest_sample(&self) -> Option<Sample> {
        lock(&self.data).statistics.back().cloned()
    }

    pub fn history_len(&self) -> usize {
        lock(&self.data).statistics.len()
    }

    /// Runs one collection cycle. The merged sample is stored only when its
    /// keys are exactly the expected fields.
    pub fn collect(&self) -> Option<Sample> {
        if self.is_terminated() {
            return None;
        }

        let mut merged = Sample::new();
        let mut fatal = None;
        {
            let mut collectors = lock(&self.collectors);
            for collector in collectors.iter_mut() {
                match collector.collect() {
                    Ok(sample) => {
                        for (key, value) in sample {
                            merged.entry(key).or_insert(value);
                        }
                    }
                    Err(CollectorError::Collection(msg)) => {
                        self.report(&format!("Collection error: {}", msg));
                    }
                    Err(CollectorError::Fatal(msg)) => {
                        fatal = Some(msg);
                        break;
                    }
                }
            }
        }

        if let Some(msg) = fatal {
            self.set_not_ready(&format!("Fatal Collector error: {}", msg));
            self.terminate();
            return None;
        }

        if !merged.keys().eq(self.fields.iter()) {
            let missing: Vec<&str> = self
                .fields
                .iter()
                .filter(|f| !merged.contains_key(*f))
                .map(String::as_str)
                .collect();
            let unexpected: Vec<&str> = merged
                .keys()
                .filter(|k| !self.fields.contains(*k))
                .map(String::as_str)
                .collect();
            let mut message = format!("Incomplete data: missing {:?}", missing);
            if !unexpected.is_empty() {
                message.push_str(&format!(", unexpected {:?}", unexpected));
            }
            self.set_not_ready(&message);
            return None;
        }

        {
            let mut data = lock(&self.data);
            if data.readiness == Readiness::Terminated {
                return None;
            }
            data.statistics.push_back(merged.clone());
            while data.statistics.len() > self.history_length {
                data.statistics.pop_front();
            }
            if data.readiness != Readiness::Ready {
                log::info!("{} is ready", self.name);
                data.readiness = Readiness::Ready;
            }
        }

        let mut plot = lock(&self.plot);
        if let PlotTarget::Pending(session) = &*plot {
            let opened = open_plotter(session, &self.name, &self.fields);
            *plot = opened;
        }
        if let PlotTarget::Open(plotter) = &mut *plot {
            if let Err(e) = plotter.plot(&merged) {
                log::warn!("{}: plotting disabled: {}", self.name, e);
                *plot = PlotTarget::Off;
            }
        }
        Some(merged)
    }

    /// Snapshot of the current state, or `None` unless the Monitor is Ready.
    /// Properties, history and variables are copied under one lock.
    pub fn interrogate(self: &Arc<Self>) -> Option<Entity> {
        let data = lock(&self.data);
        if data.readiness != Readiness::Ready {
            return None;
        }
        Some(Entity::new(
            self.name.clone(),
            data.properties.clone(),
            data.statistics.iter().cloned().collect(),
            data.variables.clone(),
            Arc::downgrade(self),
        ))
    }

    /// Merges variables written back by a policy evaluation.
    pub fn update_variables(&self, variables: IndexMap<String, Value>) {
        lock(&self.data).variables.extend(variables);
    }

    pub fn variables(&self) -> IndexMap<String, Value> {
        lock(&self.data).variables.clone()
    }

    /// Stops collection for good.
    pub fn terminate(&self) {
        let mut data = lock(&self.data);
        if data.readiness != Readiness::Terminated {
            log::info!("{} terminated", self.name);
            data.readiness = Readiness::Terminated;
        }
    }

    /// Starts the collection loop on its own thread. The loop ends when
    /// `stop` is cancelled or the Monitor terminates.
    pub fn spawn(self: Arc<Self>, interval: Duration, stop: ShutdownToken) -> io::Result<Worker> {
        let name = self.name.clone();
        Worker::spawn(name, move |heartbeat| {
            log::info!("{} starting", self.name);
            while !stop.is_cancelled() && !self.is_terminated() {
                self.collect();
                heartbeat.beat();
                if stop.wait_timeout(interval) {
                    break;
                }
            }
            log::info!("{} ending", self.name);
        })
    }

    fn set_not_ready(&self, message: &str) {
        self.report(message);
        let mut data = lock(&self.data);
        if data.readiness != Readiness::Terminated {
            data.readiness = Readiness::NotReady;
        }
    }

    /// Collection problems are loud until the Monitor is already NotReady.
    fn report(&self, message: &str) {
        if self.readiness() == Readiness::NotReady {
            log::debug!("{}: {}", self.name, message);
        } else {
            log::warn!("{}: {}", self.name, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Replays a script of results, then repeats the last one.
    struct Scripted {
        fields: BTreeSet<String>,
        script: VecDeque<Result<Sample, CollectorError>>,
        last: Result<Sample, CollectorError>,
    }

    impl Scripted {
        fn new(fields: &[&str], script: Vec<Result<Sample, CollectorError>>) -> Box<Self> {
            let last = script.last().cloned().unwrap_or_else(|| Ok(Sample::new()));
            Box::new(Scripted {
                fields: fields.iter().map(|f| f.to_string()).collect(),
                script: script.into(),
                last,
            })
        }
    }

    impl Collector for Scripted {
        fn collect(&mut self) -> Result<Sample, CollectorError> {
            self.script.pop_front().unwrap_or_else(|| self.last.clone())
        }

        fn fields(&self) -> BTreeSet<String> {
            self.fields.clone()
        }
    }

    fn sample(pairs: &[(&str, i64)]) -> Sample {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Integer(*v)))
            .collect()
    }

    fn monitor(collectors: Vec<Box<dyn Collector>>, history: usize) -> Arc<Monitor> {
        Arc::new(Monitor::new("TestMonitor", Properties::new(), collectors, history, None))
    }

    #[test]
    fn first_collector_wins_on_collisions() {
        let m = monitor(
            vec![
                Scripted::new(&["a", "b"], vec![Ok(sample(&[("a", 1), ("b", 2)]))]),
                Scripted::new(&["b", "c"], vec![Ok(sample(&[("b", 20), ("c", 30)]))]),
            ],
            5,
        );
        let merged = m.collect().unwrap();
        assert_eq!(merged, sample(&[("a", 1), ("b", 2), ("c", 30)]));
        assert!(m.is_ready());
    }

    #[test]
    fn incomplete_cycles_are_discarded() {
        let m = monitor(
            vec![Scripted::new(
                &["a", "b"],
                vec![
                    Ok(sample(&[("a", 1)])),
                    Err(CollectorError::Collection("busy".to_string())),
                    Ok(sample(&[("a", 1), ("b", 2), ("z", 3)])),
                    Ok(sample(&[("a", 1), ("b", 2)])),
                ],
            )],
            5,
        );
        assert_eq!(m.readiness(), Readiness::Unknown);
        for _ in 0..3 {
            assert!(m.collect().is_none());
            assert_eq!(m.readiness(), Readiness::NotReady);
            assert_eq!(m.history_len(), 0);
            assert!(m.interrogate().is_none());
        }
        assert!(m.collect().is_some());
        assert_eq!(m.readiness(), Readiness::Ready);
        assert_eq!(m.history_len(), 1);
    }

    #[test]
    fn fatal_errors_terminate() {
        let m = monitor(
            vec![Scripted::new(
                &["a"],
                vec![
                    Ok(sample(&[("a", 1)])),
                    Err(CollectorError::Fatal("device gone".to_string())),
                    Ok(sample(&[("a", 2)])),
                ],
            )],
            5,
        );
        assert!(m.collect().is_some());
        assert!(m.collect().is_none());
        assert_eq!(m.readiness(), Readiness::Terminated);
        assert!(m.collect().is_none());
        assert_eq!(m.readiness(), Readiness::Terminated);
        assert!(m.interrogate().is_none());
    }

    #[test]
    fn history_is_bounded() {
        let script = (1..=5).map(|i| Ok(sample(&[("a", i)]))).collect();
        let m = monitor(vec![Scripted::new(&["a"], script)], 3);
        for _ in 0..5 {
            m.collect();
        }
        let entity = m.interrogate().unwrap();
        let values: Vec<&Value> = entity.statistics().iter().map(|s| &s["a"]).collect();
        assert_eq!(
            values,
            vec![&Value::Integer(3), &Value::Integer(4), &Value::Integer(5)]
        );
    }

    #[test]
    fn stored_variables_reach_the_next_snapshot() {
        let m = monitor(vec![Scripted::new(&["a"], vec![Ok(sample(&[("a", 1)]))])], 2);
        m.collect();
        let first = m.interrogate().unwrap();
        first.set_variable("count", Value::Integer(1));
        assert!(m.interrogate().unwrap().variable("count").is_none());
        first.store_variables();
        assert_eq!(
            m.interrogate().unwrap().variable("count"),
            Some(Value::Integer(1))
        );
    }

    #[test]
    fn stop_token_ends_the_loop() {
        let m = monitor(vec![Scripted::new(&["a"], vec![Ok(sample(&[("a", 1)]))])], 2);
        let stop = ShutdownToken::new();
        let mut worker = m.clone().spawn(Duration::from_millis(5), stop.clone()).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert!(m.is_ready());
        stop.cancel();
        assert!(worker.join_timeout(Duration::from_secs(2)));
    }

    #[test]
    fn plot_file_appears_with_the_first_stored_sample() {
        let session = tempfile::tempdir().unwrap();
        let path = session.path().join("GuestMonitor-web.dat");
        let unused = Monitor::new(
            "GuestMonitor-web",
            Properties::new(),
            vec![Scripted::new(&["a"], vec![])],
            2,
            Some(session.path()),
        );
        drop(unused);
        assert!(!path.exists());

        let m = Monitor::new(
            "GuestMonitor-web",
            Properties::new(),
            vec![Scripted::new(&["a", "b"], vec![Ok(sample(&[("a", 1), ("b", 2)]))])],
            2,
            Some(session.path()),
        );
        assert!(!path.exists());
        m.collect().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "# time\t a\t b");
        assert!(lines[1].ends_with("\t1\t2"));
    }
}
