//! Lifecycle controller: owns the script thread and its start/stop protocol
//!
//! At most one run is active per [`Interpreter`]. `stop()` raises the abort
//! token and the collaborators' fast-abort flag, then blocks until the script
//! thread reports completion, polling a channel so that a slow shutdown is
//! logged instead of hanging silently.

use crate::collaborators::Environment;
use crate::config::InterpreterConfig;
use crate::error::LifecycleError;
use crate::loader::{self, LoadReport};
use crate::model::{Event, Registry};
use crate::runtime::cancel::CancelToken;
use crate::runtime::status::{RunStatus, StatusBoard};
use crate::runtime::{Run, RunOutcome, RunSummary};
use crate::types::Script;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const LOG_TARGET: &str = "armscript::engine";
const THREAD_NAME: &str = "armscript-program";

struct Worker {
    handle: JoinHandle<Option<RunOutcome>>,
    done: Receiver<()>,
    finished: bool,
}

impl Worker {
    fn is_finished(&self) -> bool {
        self.finished || self.handle.is_finished()
    }

    /// Wait up to `timeout` for the run to end; `None` waits forever
    fn wait(&mut self, timeout: Option<Duration>) -> bool {
        if self.finished {
            return true;
        }
        let ended = match timeout {
            None => {
                let _ = self.done.recv();
                true
            }
            Some(timeout) => match self.done.recv_timeout(timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                Err(RecvTimeoutError::Timeout) => false,
            },
        };
        self.finished |= ended;
        self.finished
    }

    fn join(self) -> Result<RunOutcome, LifecycleError> {
        match self.handle.join() {
            Ok(Some(outcome)) => Ok(outcome),
            _ => {
                log::error!(target: LOG_TARGET, "Script thread panicked");
                Err(LifecycleError::WorkerPanicked)
            }
        }
    }
}

/// Handle for requesting a stop from another thread, such as a signal handler
/// or a caller blocked in a synchronous `start(false)`.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancelToken,
    env: Environment,
}

impl StopHandle {
    /// Raise the abort flag without waiting for the run to end
    pub fn request_stop(&self) {
        self.env.set_exiting(true);
        self.token.cancel();
    }
}

/// Loads scripts and runs them against an [`Environment`]
pub struct Interpreter {
    env: Environment,
    config: InterpreterConfig,
    registry: Registry,
    events: Vec<Event>,
    token: CancelToken,
    board: Arc<StatusBoard>,
    worker: Option<Worker>,
    last_summary: Option<RunSummary>,
}

impl Interpreter {
    pub fn new(env: Environment) -> Self {
        Self::with_config(env, InterpreterConfig::default())
    }

    pub fn with_config(env: Environment, config: InterpreterConfig) -> Self {
        Self {
            env,
            config,
            registry: Registry::with_builtins(),
            events: Vec::new(),
            token: CancelToken::new(),
            board: Arc::new(StatusBoard::new()),
            worker: None,
            last_summary: None,
        }
    }

    /// Replace the kind registry used by later loads
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Build the events of `script` for the next `start`.
    ///
    /// Returns the problems found. Parts that failed to load are left out and
    /// the rest of the script is kept.
    pub fn load_script(&mut self, script: &Script) -> Result<LoadReport, LifecycleError> {
        if self.is_running() {
            log::error!(target: LOG_TARGET, "Cannot load a script while one is running");
            return Err(LifecycleError::AlreadyRunning);
        }
        self.reap_finished()?;

        let loaded = loader::load(script, &self.registry);
        self.events = loaded.events;
        Ok(loaded.errors)
    }

    /// Number of events ready to run
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Start the loaded script, on a named thread or on the caller's thread.
    ///
    /// A synchronous start returns once the run has ended, which only happens
    /// when a command kills the program or a [`StopHandle`] is used.
    pub fn start(&mut self, threaded: bool) -> Result<(), LifecycleError> {
        if self.is_running() {
            log::error!(target: LOG_TARGET, "Tried to start a script while one is already running");
            return Err(LifecycleError::AlreadyRunning);
        }
        self.reap_finished()?;

        self.env.set_exiting(false);
        self.env.robot().set_active_servos(true);
        self.env.robot().set_speed(self.config.default_speed);
        self.board.clear();
        self.token.reset();
        self.last_summary = None;

        let run = Run::new(
            std::mem::take(&mut self.events),
            self.env.clone(),
            self.token.clone(),
            Arc::clone(&self.board),
            &self.config,
        );

        if !threaded {
            let outcome = run.execute();
            self.env.set_exiting(false);
            self.finish(outcome);
            return Ok(());
        }

        // The run is handed over once the thread exists, so a failed spawn
        // leaves the loaded events in place.
        let (run_tx, run_rx) = mpsc::channel::<Run>();
        let (done_tx, done_rx) = mpsc::channel();
        let mut builder = thread::Builder::new().name(THREAD_NAME.to_string());
        if let Some(size) = self.config.worker_stack_size {
            builder = builder.stack_size(size);
        }
        let spawned = builder.spawn(move || {
            let outcome = run_rx.recv().ok().map(Run::execute);
            let _ = done_tx.send(());
            outcome
        });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(source) => {
                log::error!(target: LOG_TARGET, "Could not start script thread: {source}");
                self.events = run.into_events();
                return Err(LifecycleError::Spawn { source });
            }
        };
        if let Err(mpsc::SendError(run)) = run_tx.send(run) {
            self.events = run.into_events();
            let _ = handle.join();
            return Err(LifecycleError::WorkerPanicked);
        }

        self.worker = Some(Worker {
            handle,
            done: done_rx,
            finished: false,
        });
        Ok(())
    }

    /// Stop the run and block until the script thread has exited.
    ///
    /// Also reaps a run that already ended by itself. The loaded events are
    /// dropped; load a script again before the next `start`.
    pub fn stop(&mut self) -> Result<RunSummary, LifecycleError> {
        let Some(mut worker) = self.worker.take() else {
            return Err(LifecycleError::NotRunning);
        };

        // Fast-abort first: the destroy pass clears it once it sees the token
        self.env.set_exiting(true);
        self.token.cancel();

        let poll = self.config.stop_poll_interval();
        let requested = Instant::now();
        while !worker.wait(Some(poll)) {
            log::debug!(
                target: LOG_TARGET,
                "Waiting for script thread to exit ({:?})",
                requested.elapsed()
            );
        }

        let outcome = worker.join();
        self.env.set_exiting(false);
        self.events.clear();
        self.board.clear();

        let outcome = outcome?;
        log::info!(
            target: LOG_TARGET,
            "Script stopped after {} tick(s) in {:?}",
            outcome.summary.ticks,
            requested.elapsed()
        );
        self.last_summary = Some(outcome.summary.clone());
        Ok(outcome.summary)
    }

    /// Block until the run ends by itself. Returns `false` on timeout.
    pub fn wait(&mut self, timeout: Option<Duration>) -> bool {
        match &mut self.worker {
            Some(worker) => worker.wait(timeout),
            None => true,
        }
    }

    /// Commands executed in the latest tick, or `NotRunning` when idle
    pub fn status(&self) -> RunStatus {
        if self.is_running() {
            RunStatus::Running(self.board.snapshot())
        } else {
            RunStatus::NotRunning
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Whether a stop has been requested for the active run
    pub fn is_exiting(&self) -> bool {
        self.worker.is_some() && self.token.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.token.clone(),
            env: self.env.clone(),
        }
    }

    /// Summary of the most recent completed run
    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    /// Collect a run that ended on its own, keeping its events loaded
    fn reap_finished(&mut self) -> Result<(), LifecycleError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let outcome = worker.join()?;
        self.env.set_exiting(false);
        self.finish(outcome);
        Ok(())
    }

    fn finish(&mut self, outcome: RunOutcome) {
        self.events = outcome.events;
        self.last_summary = Some(outcome.summary);
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("events", &self.events.len())
            .field("running", &self.is_running())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
