//! Per-call view of the running script handed to commands and triggers

use crate::collaborators::Environment;
use crate::runtime::cancel::CancelToken;
use crate::sandbox::Sandbox;
use std::time::{Duration, Instant};

pub struct RunContext<'a> {
    sandbox: &'a mut Sandbox,
    env: &'a Environment,
    token: &'a CancelToken,
    started: Instant,
    tick: u64,
    sleep_poll: Duration,
}

impl<'a> RunContext<'a> {
    pub fn new(
        sandbox: &'a mut Sandbox,
        env: &'a Environment,
        token: &'a CancelToken,
        started: Instant,
        tick: u64,
        sleep_poll: Duration,
    ) -> Self {
        Self {
            sandbox,
            env,
            token,
            started,
            tick,
            sleep_poll,
        }
    }

    pub fn sandbox(&mut self) -> &mut Sandbox {
        self.sandbox
    }

    pub fn env(&self) -> &Environment {
        self.env
    }

    /// Whether the run has been asked to abort
    pub fn is_stopping(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Abort-aware sleep; `false` if interrupted
    pub fn sleep(&self, duration: Duration) -> bool {
        self.token.sleep(duration, self.sleep_poll)
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 1-based index of the current tick, 0 during the shutdown pass
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn token(&self) -> &CancelToken {
        self.token
    }
}
