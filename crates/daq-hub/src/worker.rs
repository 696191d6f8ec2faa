//! Worker lifecycle
//!
//! A worker runs one [`PollLoop`] on a dedicated thread:
//!
//! ```text
//! Idle -> Starting -> Running -> Stopping -> Idle
//!           |                       |
//!           +-- setup failed -------+-- budget exceeded: thread detached
//! ```
//!
//! `setup` runs on the caller's thread so that a failed start is reported
//! synchronously and leaves the worker idle. `teardown` runs on the worker
//! thread after the last tick, so a clean stop returns only once the loop
//! has released its hardware.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use daq_sdk::SdkError;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use crate::config::HubConfig;
use crate::error::HubError;
use crate::state::Subsystem;

/// Cooperative cancellation flag with an interruptible sleep
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock() = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for `timeout` or until cancelled; returns true if cancelled
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let mut cancelled = flag.lock();
        if !*cancelled {
            let _ = cvar.wait_while_for(&mut cancelled, |c| !*c, timeout);
        }
        *cancelled
    }
}

/// Outcome of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    /// The loop has nothing more to do
    Finished,
}

/// Body of a worker
pub trait PollLoop: Send + 'static {
    /// Create and start hardware tasks
    ///
    /// On error the loop is dropped, which must release anything created so
    /// far.
    fn setup(&mut self) -> Result<(), SdkError>;

    /// One iteration; must not block beyond the SDK's own I/O timeout
    fn tick(&mut self) -> Tick;

    /// Final writes and task teardown, on the worker thread
    fn teardown(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Timing knobs for a worker
#[derive(Debug, Clone, Copy)]
pub struct WorkerTiming {
    pub tick_interval: Duration,
    pub stop_retries: u32,
    pub stop_retry_interval: Duration,
}

impl From<&HubConfig> for WorkerTiming {
    fn from(config: &HubConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            stop_retries: config.stop_retries,
            stop_retry_interval: config.stop_retry_interval(),
        }
    }
}

/// One long-lived polling thread
#[derive(Debug)]
pub struct Worker {
    subsystem: Subsystem,
    name: &'static str,
    timing: WorkerTiming,
    state: WorkerState,
    token: StopToken,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn new(subsystem: Subsystem, timing: WorkerTiming) -> Self {
        Self {
            subsystem,
            name: subsystem.thread_name(),
            timing,
            state: WorkerState::Idle,
            token: StopToken::new(),
            thread: None,
        }
    }

    pub fn subsystem(&self) -> Subsystem {
        self.subsystem
    }

    /// Current state; a loop that finished on its own reads as idle
    pub fn state(&self) -> WorkerState {
        match &self.thread {
            Some(handle) if !handle.is_finished() => self.state,
            _ => WorkerState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    fn set_state(&mut self, state: WorkerState) {
        debug!("{}: {:?} -> {:?}", self.name, self.state, state);
        self.state = state;
    }

    /// Run `setup` here, then spawn the loop
    pub fn start<L: PollLoop>(&mut self, mut poll_loop: L) -> Result<(), HubError> {
        if self.is_running() {
            return Err(HubError::AlreadyRunning(self.subsystem));
        }
        self.reap();

        self.set_state(WorkerState::Starting);
        if let Err(e) = poll_loop.setup() {
            drop(poll_loop);
            self.set_state(WorkerState::Idle);
            return Err(e.into());
        }

        let token = StopToken::new();
        let loop_token = token.clone();
        let interval = self.timing.tick_interval;
        let name = self.name;

        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_loop(name, poll_loop, loop_token, interval));

        match spawned {
            Ok(handle) => {
                self.token = token;
                self.thread = Some(handle);
                self.set_state(WorkerState::Running);
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Idle);
                Err(e.into())
            }
        }
    }

    /// Cancel the loop and wait for it within the retry budget
    ///
    /// Returns false if the loop overran the budget and was detached.
    pub fn stop(&mut self) -> bool {
        let Some(handle) = self.thread.take() else {
            self.state = WorkerState::Idle;
            return true;
        };

        self.set_state(WorkerState::Stopping);
        self.token.cancel();

        for _ in 0..self.timing.stop_retries {
            if handle.is_finished() {
                break;
            }
            thread::sleep(self.timing.stop_retry_interval);
        }

        let clean = handle.is_finished();
        if clean {
            if handle.join().is_err() {
                error!("{} worker panicked", self.name);
            }
        } else {
            let budget = self.timing.stop_retry_interval * self.timing.stop_retries;
            error!(
                "{} worker did not stop within {:?}; detaching it",
                self.name, budget
            );
        }

        self.set_state(WorkerState::Idle);
        clean
    }

    /// Join a loop that finished on its own
    pub fn reap(&mut self) {
        if self.thread.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = self.thread.take() {
                if handle.join().is_err() {
                    error!("{} worker panicked", self.name);
                }
            }
            self.state = WorkerState::Idle;
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<L: PollLoop>(name: &str, mut poll_loop: L, token: StopToken, interval: Duration) {
    info!("{} worker started", name);
    while !token.is_cancelled() {
        if poll_loop.tick() == Tick::Finished {
            break;
        }
        if token.wait(interval) {
            break;
        }
    }
    poll_loop.teardown();
    info!("{} worker stopped", name);
}
