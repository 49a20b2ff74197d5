//! The daemon: wiring, the supervision loop and the in-process control API.

use crate::config::MomConfig;
use crate::controllers::{load_controllers, ControllerContext};
use crate::entity::Sample;
use crate::error::MomError;
use crate::guest_manager::GuestManager;
use crate::logging;
use crate::monitor::{create_host_monitor, Monitor};
use crate::plotter::Plotter;
use crate::policy_engine::PolicyEngine;
use crate::registry::Plugins;
use crate::shutdown::ShutdownToken;
use crate::worker::Worker;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Mom {
    config: MomConfig,
    host: Arc<Monitor>,
    guests: Arc<GuestManager>,
    engine: Arc<PolicyEngine>,
}

impl Mom {
    /// Builds every component from the configuration and the registered
    /// plugins. Nothing runs until [`Mom::run`].
    pub fn new(config: MomConfig, plugins: &Plugins) -> Result<Self, MomError> {
        config.validate()?;

        let plot_session = match config.plot_dir() {
            Some(base) => {
                let dir = Plotter::create_session_dir(base)?;
                log::info!("Plotting to {}", dir.display());
                Some(dir)
            }
            None => None,
        };

        let make_hypervisor = plugins.hypervisors.get(config.main.hypervisor_interface.trim())?;
        let hypervisor = make_hypervisor(&config)?;

        let collectors = Arc::new(plugins.collectors.clone());
        let host = Arc::new(create_host_monitor(
            &config,
            &collectors,
            plot_session.as_deref(),
        )?);
        let guests = Arc::new(GuestManager::new(
            config.clone(),
            hypervisor.clone(),
            collectors,
            plot_session,
        ));

        let context = ControllerContext {
            hypervisor,
            config: &config,
        };
        let controllers = load_controllers(&config.main.controllers, &plugins.controllers, &context);
        let engine = Arc::new(PolicyEngine::new(host.clone(), guests.clone(), controllers));

        let source = match config.policy_path() {
            Some(path) => std::fs::read_to_string(path).map_err(|source| {
                log::error!("Policy Engine initialization failed");
                MomError::PolicyFile {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            None => String::new(),
        };
        engine.load_policy(&source)?;

        Ok(Mom {
            config,
            host,
            guests,
            engine,
        })
    }

    pub fn handle(&self) -> MomHandle {
        MomHandle {
            host: self.host.clone(),
            guests: self.guests.clone(),
            engine: self.engine.clone(),
        }
    }

    /// Runs the daemon until `shutdown` is cancelled or a worker dies or
    /// stops responding. Workers are joined in the order policy engine,
    /// guest manager, host monitor.
    pub fn run(&self, shutdown: &ShutdownToken) -> Result<(), MomError> {
        log::info!("MOM starting");
        let mut workers = Vec::with_capacity(3);
        if let Err(e) = self.start_workers(shutdown, &mut workers) {
            log::error!("Unable to start threads: {}", e);
            shutdown.cancel();
            Self::join_all(workers);
            return Err(e.into());
        }

        let mut failed = None;
        while !shutdown.wait_timeout(self.config.main.main_loop_interval()) {
            let now = Instant::now();
            if let Some(s) = workers
                .iter()
                .find(|s| s.worker.check(now, s.interval).is_fatal())
            {
                failed = Some(s.worker.name().to_string());
                break;
            }
        }

        shutdown.cancel();
        Self::join_all(workers);
        log::info!("MOM ending");
        match failed {
            Some(name) => Err(MomError::WorkerFailed(name)),
            None => Ok(()),
        }
    }

    fn start_workers(&self, shutdown: &ShutdownToken, workers: &mut Vec<Supervised>) -> io::Result<()> {
        let main = &self.config.main;
        let timeouts = &self.config.shutdown;

        let interval = main.host_monitor_interval();
        workers.push(Supervised {
            worker: self.host.clone().spawn(interval, shutdown.clone())?,
            interval,
            timeout: timeouts.host_monitor_timeout(),
        });

        let interval = main.guest_manager_interval();
        workers.push(Supervised {
            worker: self.guests.clone().spawn(interval, shutdown.clone())?,
            interval,
            timeout: timeouts.guest_manager_timeout(),
        });

        let interval = main.policy_engine_interval();
        workers.push(Supervised {
            worker: self.engine.clone().spawn(interval, shutdown.clone())?,
            interval,
            timeout: timeouts.policy_engine_timeout(),
        });
        Ok(())
    }

    /// Joins in reverse start order: the engine first, the host monitor last.
    fn join_all(workers: Vec<Supervised>) {
        for mut s in workers.into_iter().rev() {
            s.worker.join_timeout(s.timeout);
        }
    }
}

struct Supervised {
    worker: Worker,
    /// Loop interval the heartbeat is judged against
    interval: Duration,
    timeout: Duration,
}

/// Newest samples reported by [`MomHandle::get_statistics`].
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub host: Option<Sample>,
    /// Keyed by guest name
    pub guests: BTreeMap<String, Sample>,
}

/// In-process control surface of a running daemon.
#[derive(Clone)]
pub struct MomHandle {
    host: Arc<Monitor>,
    guests: Arc<GuestManager>,
    engine: Arc<PolicyEngine>,
}

impl MomHandle {
    pub fn ping(&self) -> bool {
        true
    }

    pub fn get_policy(&self) -> String {
        self.engine.get_policy()
    }

    /// Installs a new policy. On a syntax error the old policy stays active
    /// and `false` is returned.
    pub fn set_policy(&self, source: &str) -> bool {
        self.engine.set_policy(source)
    }

    /// Changes the daemon's log level (`debug`, `info`, `warn`, `error`,
    /// `critical` or `5`..`1`). Returns `false` when logging was never set up.
    pub fn set_verbosity(&self, verbosity: &str) -> bool {
        log::info!("setVerbosity({})", verbosity);
        match logging::set_verbosity(verbosity) {
            Ok(level) => {
                log::info!("log level is now {}", level);
                true
            }
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            host: self.host.latest_sample(),
            guests: self.guests.latest_samples(),
        }
    }

    pub fn get_statistics(&self) -> Result<serde_json::Value, MomError> {
        Ok(serde_json::to_value(self.statistics())?)
    }

    pub fn get_active_guests(&self) -> Vec<String> {
        self.guests.active_guests()
    }
}
