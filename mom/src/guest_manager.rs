//! Supervision of the guest Monitor population
//!
//! Every tick the manager asks the hypervisor which guests are running,
//! starts a Monitor thread for each new one and reaps Monitors whose thread
//! exited or whose guest disappeared. The registry lock is never held while
//! a Monitor is being built or joined.

use crate::collectors::CollectorFactory;
use crate::config::MomConfig;
use crate::entity::{Entity, Sample};
use crate::hypervisor::{GuestId, Hypervisor};
use crate::monitor::{create_guest_monitor, Monitor};
use crate::registry::PluginRegistry;
use crate::shutdown::{lock, ShutdownToken};
use crate::worker::{Heartbeat, Worker};
use mom_policy::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct GuestEntry {
    monitor: Arc<Monitor>,
    worker: Worker,
    stop: ShutdownToken,
}

pub struct GuestManager {
    config: MomConfig,
    hypervisor: Arc<dyn Hypervisor>,
    collectors: Arc<PluginRegistry<CollectorFactory>>,
    plot_session: Option<PathBuf>,
    guests: Mutex<BTreeMap<GuestId, GuestEntry>>,
}

impl GuestManager {
    pub fn new(
        config: MomConfig,
        hypervisor: Arc<dyn Hypervisor>,
        collectors: Arc<PluginRegistry<CollectorFactory>>,
        plot_session: Option<PathBuf>,
    ) -> Self {
        GuestManager {
            config,
            hypervisor,
            collectors,
            plot_session,
            guests: Mutex::new(BTreeMap::new()),
        }
    }

    /// One discovery-and-reap pass. An empty or failed guest listing means
    /// the population is unknown, so nothing is spawned or reaped.
    pub fn tick(&self) {
        let ids = match self.hypervisor.list_active_guests() {
            Ok(ids) if !ids.is_empty() => ids,
            Ok(_) => {
                log::debug!("Hypervisor reported no active guests");
                return;
            }
            Err(e) => {
                log::warn!("Unable to list active guests: {}", e);
                return;
            }
        };
        let active: BTreeSet<GuestId> = ids.into_iter().collect();
        self.spawn_guest_monitors(&active);
        self.check_threads(&active);
    }

    /// Starts Monitors for guests not yet tracked. Monitor construction may
    /// block, so it happens outside the registry lock; if another caller
    /// registered the guest meanwhile, the new Monitor is dropped unstarted.
    pub fn spawn_guest_monitors(&self, active: &BTreeSet<GuestId>) {
        let spawn_list: Vec<GuestId> = {
            let guests = lock(&self.guests);
            active
                .iter()
                .filter(|id| !guests.contains_key(*id))
                .cloned()
                .collect()
        };

        for id in spawn_list {
            let monitor = match create_guest_monitor(
                &id,
                self.hypervisor.as_ref(),
                &self.config,
                &self.collectors,
                self.plot_session.as_deref(),
            ) {
                Ok(monitor) => Arc::new(monitor),
                Err(e) => {
                    log::warn!("Not monitoring guest:{}: {}", id, e);
                    continue;
                }
            };

            let mut guests = lock(&self.guests);
            if guests.contains_key(&id) {
                log::debug!("Guest:{} was registered concurrently", id);
                continue;
            }
            let stop = ShutdownToken::new();
            let interval = self.config.main.guest_monitor_interval();
            match monitor.clone().spawn(interval, stop.clone()) {
                Ok(worker) => {
                    guests.insert(
                        id,
                        GuestEntry {
                            monitor,
                            worker,
                            stop,
                        },
                    );
                }
                Err(e) => log::error!("Cannot start thread for guest:{}: {}", id, e),
            }
        }
    }

    /// Removes guests whose Monitor thread exited or that are no longer in
    /// `active`, then stops and joins them.
    pub fn check_threads(&self, active: &BTreeSet<GuestId>) {
        let removed: Vec<(GuestId, GuestEntry)> = {
            let mut guests = lock(&self.guests);
            let stale: Vec<GuestId> = guests
                .iter()
                .filter(|(id, entry)| !entry.worker.is_alive() || !active.contains(*id))
                .map(|(id, _)| id.clone())
                .collect();
            stale
                .into_iter()
                .filter_map(|id| guests.remove(&id).map(|entry| (id, entry)))
                .collect()
        };

        let timeout = self.config.shutdown.guest_monitor_timeout();
        for (id, mut entry) in removed {
            if entry.worker.is_alive() {
                log::info!("Guest:{} is no longer active", id);
            } else {
                log::info!("{} has exited", entry.monitor.name());
            }
            entry.monitor.terminate();
            entry.stop.cancel();
            entry.worker.join_timeout(timeout);
        }
    }

    /// Snapshots of every ready guest, keyed by guest id.
    pub fn interrogate(&self) -> BTreeMap<GuestId, Entity> {
        self.monitors()
            .into_iter()
            .filter_map(|(id, monitor)| monitor.interrogate().map(|entity| (id, entity)))
            .collect()
    }

    /// Names of the guests whose Monitor is ready.
    pub fn active_guests(&self) -> Vec<String> {
        self.monitors()
            .into_iter()
            .filter(|(_, monitor)| monitor.is_ready())
            .filter_map(|(_, monitor)| match monitor.property("name") {
                Some(Value::String(name)) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Newest sample of every ready guest, keyed by guest name.
    pub fn latest_samples(&self) -> BTreeMap<String, Sample> {
        self.monitors()
            .into_iter()
            .filter(|(_, monitor)| monitor.is_ready())
            .filter_map(|(id, monitor)| {
                let name = match monitor.property("name") {
                    Some(Value::String(name)) => name,
                    _ => id,
                };
                monitor.latest_sample().map(|sample| (name, sample))
            })
            .collect()
    }

    pub fn guest_ids(&self) -> Vec<GuestId> {
        lock(&self.guests).keys().cloned().collect()
    }

    /// Runs the discovery loop until `stop` is cancelled, then shuts every
    /// guest Monitor down.
    pub fn run(&self, stop: &ShutdownToken, heartbeat: &Heartbeat, interval: Duration) {
        log::info!("Guest Manager starting");
        while !stop.is_cancelled() {
            self.tick();
            heartbeat.beat();
            if stop.wait_timeout(interval) {
                break;
            }
        }
        self.shutdown_guests();
        log::info!("Guest Manager ending");
    }

    pub fn spawn(self: Arc<Self>, interval: Duration, stop: ShutdownToken) -> io::Result<Worker> {
        Worker::spawn("GuestManager", move |heartbeat| {
            self.run(&stop, &heartbeat, interval)
        })
    }

    /// Stops every guest Monitor and waits for each up to the configured
    /// timeout. Threads still running afterwards are abandoned.
    pub fn shutdown_guests(&self) {
        let entries: Vec<GuestEntry> = std::mem::take(&mut *lock(&self.guests))
            .into_values()
            .collect();
        for entry in &entries {
            entry.stop.cancel();
        }
        let timeout = self.config.shutdown.guest_monitor_timeout();
        for mut entry in entries {
            entry.worker.join_timeout(timeout);
        }
    }

    fn monitors(&self) -> Vec<(GuestId, Arc<Monitor>)> {
        lock(&self.guests)
            .iter()
            .map(|(id, entry)| (id.clone(), entry.monitor.clone()))
            .collect()
    }
}
