//! The evaluate-then-act loop
//!
//! Every interval the engine snapshots the host and the ready guests, runs
//! the installed policy over them and hands the entities to the configured
//! controllers. The policy can be replaced at any time; a tick always runs
//! against exactly one program.

use crate::controllers::NamedController;
use crate::entity::Entity;
use crate::guest_manager::GuestManager;
use crate::monitor::Monitor;
use crate::shutdown::{lock, ShutdownToken};
use crate::worker::{Heartbeat, Worker};
use mom_policy::{Policy, PolicyError, Value};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What one tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// The host Monitor had no complete snapshot yet
    HostNotReady,
    /// The policy failed; controllers were not called
    EvaluationFailed(PolicyError),
    /// The interpreter panicked; controllers were not called
    EvaluationPanicked(String),
    Completed {
        results: Vec<Value>,
        /// `(controller, message)` for every controller that failed
        controller_errors: Vec<(String, String)>,
    },
}

pub struct PolicyEngine {
    policy: Mutex<Arc<Policy>>,
    host: Arc<Monitor>,
    guests: Arc<GuestManager>,
    controllers: Mutex<Vec<NamedController>>,
}

impl PolicyEngine {
    /// Starts with the inert empty policy installed.
    pub fn new(
        host: Arc<Monitor>,
        guests: Arc<GuestManager>,
        controllers: Vec<NamedController>,
    ) -> Self {
        PolicyEngine {
            policy: Mutex::new(Arc::new(Policy::empty())),
            host,
            guests,
            controllers: Mutex::new(controllers),
        }
    }

    /// Parses and installs `source`. Blank text installs the empty policy.
    /// On a syntax error the current policy stays in place.
    pub fn load_policy(&self, source: &str) -> Result<(), PolicyError> {
        let policy = if source.trim().is_empty() {
            log::warn!("PolicyEngine: No policy specified.");
            Policy::empty()
        } else {
            Policy::parse(source).map_err(|e| {
                log::error!("Policy not loaded: {}", e);
                e
            })?
        };
        *lock(&self.policy) = Arc::new(policy);
        Ok(())
    }

    /// Like [`load_policy`](Self::load_policy), reporting only success.
    pub fn set_policy(&self, source: &str) -> bool {
        self.load_policy(source).is_ok()
    }

    pub fn get_policy(&self) -> String {
        self.current_policy().source().to_string()
    }

    pub fn current_policy(&self) -> Arc<Policy> {
        lock(&self.policy).clone()
    }

    pub fn controller_names(&self) -> Vec<String> {
        lock(&self.controllers).iter().map(|c| c.name.clone()).collect()
    }

    /// One evaluate-then-act cycle.
    pub fn do_controls(&self) -> TickOutcome {
        let Some(host) = self.host.interrogate() else {
            log::debug!("Host is not ready; skipping policy evaluation");
            return TickOutcome::HostNotReady;
        };
        let host = Arc::new(host);
        let guests: Vec<Arc<Entity>> = self
            .guests
            .interrogate()
            .into_values()
            .map(Arc::new)
            .collect();

        let policy = self.current_policy();
        let guest_list = guests.iter().map(|g| Value::Object(g.clone())).collect();
        let globals = [
            ("Host", Value::Object(host.clone())),
            ("Guests", Value::List(guest_list)),
        ];
        let evaluation = panic::catch_unwind(AssertUnwindSafe(|| policy.evaluate(&globals)));
        let results = match evaluation {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                log::warn!("{}", e);
                return TickOutcome::EvaluationFailed(e);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Policy evaluation {}", message);
                return TickOutcome::EvaluationPanicked(message);
            }
        };

        host.store_variables();
        for guest in &guests {
            guest.store_variables();
        }

        let mut controller_errors = Vec::new();
        for named in lock(&self.controllers).iter_mut() {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| named.controller.process(&host, &guests)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };
            log::error!("Controller {} failed: {}", named.name, message);
            controller_errors.push((named.name.clone(), message));
        }

        TickOutcome::Completed {
            results,
            controller_errors,
        }
    }

    /// Waits one interval, then runs a tick, until `stop` is cancelled.
    pub fn run(&self, stop: &ShutdownToken, heartbeat: &Heartbeat, interval: Duration) {
        log::info!("Policy Engine starting");
        while !stop.wait_timeout(interval) {
            self.do_controls();
            heartbeat.beat();
        }
        log::info!("Policy Engine ending");
    }

    pub fn spawn(self: Arc<Self>, interval: Duration, stop: ShutdownToken) -> io::Result<Worker> {
        Worker::spawn("PolicyEngine", move |heartbeat| {
            self.run(&stop, &heartbeat, interval)
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
