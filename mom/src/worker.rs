//! Long-lived named threads with liveness tracking.

use crate::shutdown::lock;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Completion time of a loop's most recent iteration.
#[derive(Debug, Clone)]
pub struct Heartbeat(Arc<Mutex<Instant>>);

impl Heartbeat {
    pub fn new() -> Self {
        Heartbeat(Arc::new(Mutex::new(Instant::now())))
    }

    /// Records that an iteration just completed.
    pub fn beat(&self) {
        *lock(&self.0) = Instant::now();
    }

    pub fn last(&self) -> Instant {
        *lock(&self.0)
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    /// No heartbeat for more than 5 intervals
    Stalled(Duration),
    /// No heartbeat for more than 10 intervals
    Unresponsive(Duration),
    /// The thread has exited
    Dead,
}

impl Health {
    /// Whether the supervisor must stop the daemon.
    pub fn is_fatal(self) -> bool {
        matches!(self, Health::Dead | Health::Unresponsive(_))
    }
}

/// A named thread that runs one loop for the lifetime of the daemon.
#[derive(Debug)]
pub struct Worker {
    name: String,
    handle: Option<JoinHandle<()>>,
    heartbeat: Heartbeat,
}

impl Worker {
    /// Starts `body` on a new thread. The body receives the heartbeat to
    /// update after every iteration.
    pub fn spawn<F>(name: impl Into<String>, body: F) -> io::Result<Worker>
    where
        F: FnOnce(Heartbeat) + Send + 'static,
    {
        let name = name.into();
        let heartbeat = Heartbeat::new();
        let thread_heartbeat = heartbeat.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || body(thread_heartbeat))?;
        Ok(Worker {
            name,
            handle: Some(handle),
            heartbeat,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    pub fn last_heartbeat(&self) -> Instant {
        self.heartbeat.last()
    }

    /// Classifies the worker from its heartbeat age, logging anything that is
    /// not healthy.
    pub fn check(&self, now: Instant, interval: Duration) -> Health {
        if !self.is_alive() {
            log::error!("Thread {} has unexpectedly quit", self.name);
            return Health::Dead;
        }
        let delay = now.saturating_duration_since(self.last_heartbeat());
        if delay > interval * 10 {
            log::error!("Thread {} has stopped responding", self.name);
            return Health::Unresponsive(delay);
        }
        if delay > interval * 5 {
            log::warn!(
                "Thread {} has been stalled for {} seconds",
                self.name,
                delay.as_secs()
            );
            return Health::Stalled(delay);
        }
        Health::Healthy
    }

    /// Waits up to `timeout` for the thread to finish. A thread still running
    /// at the deadline is detached and left to exit on its own.
    pub fn join_timeout(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                log::warn!(
                    "Thread {} did not finish within {:?}, abandoning it",
                    self.name,
                    timeout
                );
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        if handle.join().is_err() {
            log::error!("Thread {} panicked", self.name);
        }
        true
    }
}
