//! Execution engine: the fixed-rate tick loop and the block-skip interpreter
//!
//! A [`Run`] owns everything one script execution needs (events, sandbox,
//! abort token) and is consumed by [`Run::execute`], which blocks until the
//! token is cancelled by `stop()` or by a command signalling [`Signal::Kill`].

use crate::collaborators::Environment;
use crate::config::InterpreterConfig;
use crate::model::{Command, Event, EventRole, Signal, Structure};
use crate::sandbox::Sandbox;
use rhai::Dynamic;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod cancel;
pub mod context;
pub mod status;
pub mod timer;

#[cfg(test)]
mod tests;

use cancel::CancelToken;
use context::RunContext;
use status::{StatusBoard, StatusMap};
use timer::TickTimer;

const LOG_TARGET: &str = "armscript::engine";

/// Final state of a finished run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Number of ticks executed
    pub ticks: u64,
    /// Commands executed in the last tick
    pub status: StatusMap,
    /// User variables at the end of the run
    pub variables: BTreeMap<String, Dynamic>,
    /// Whether a command ended the run with a kill signal
    pub killed: bool,
}

/// What a finished run hands back to its controller
#[derive(Debug)]
pub struct RunOutcome {
    pub events: Vec<Event>,
    pub summary: RunSummary,
}

/// One script execution
pub struct Run {
    events: Vec<Event>,
    sandbox: Sandbox,
    env: Environment,
    token: CancelToken,
    board: Arc<StatusBoard>,
    tick_period: Duration,
    sleep_poll: Duration,
    killed: bool,
}

impl Run {
    /// Prepare a run with a fresh sandbox for `events`
    pub fn new(
        events: Vec<Event>,
        env: Environment,
        token: CancelToken,
        board: Arc<StatusBoard>,
        config: &InterpreterConfig,
    ) -> Self {
        let sleep_poll = config.sleep_poll_interval();
        let sandbox = Sandbox::new(&env, token.clone(), &config.sandbox, sleep_poll);
        Self {
            events,
            sandbox,
            env,
            token,
            board,
            tick_period: config.tick_period(),
            sleep_poll,
            killed: false,
        }
    }

    /// Give back the events of a run that was never executed
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Run ticks until the token is cancelled, then run the shutdown pass
    pub fn execute(mut self) -> RunOutcome {
        log::info!(
            target: LOG_TARGET,
            "Starting program: {} event(s), tick period {:?}",
            self.events.len(),
            self.tick_period
        );

        let started = Instant::now();
        let mut timer = TickTimer::new(self.tick_period);
        let mut ticks = 0;

        while !self.token.is_cancelled() {
            if !timer.wait(&self.token, self.sleep_poll) {
                break;
            }
            ticks += 1;
            self.tick(ticks, started);
        }

        log::info!(target: LOG_TARGET, "Program stopping after {ticks} tick(s)");
        self.shutdown(started);

        let summary = RunSummary {
            ticks,
            status: (*self.board.snapshot()).clone(),
            variables: self.sandbox.variables(),
            killed: self.killed,
        };
        RunOutcome {
            events: self.events,
            summary,
        }
    }

    fn tick(&mut self, tick: u64, started: Instant) {
        let mut executed = StatusMap::new();
        self.board.publish(executed.clone());

        for (index, event) in self.events.iter_mut().enumerate() {
            if self.token.is_cancelled() {
                break;
            }
            if event.role() == EventRole::Destroy {
                continue;
            }

            let mut ctx = RunContext::new(
                &mut self.sandbox,
                &self.env,
                &self.token,
                started,
                tick,
                self.sleep_poll,
            );
            if !event.is_active(&mut ctx) {
                continue;
            }

            let ran = interpret(event.commands_mut(), &mut ctx, true);
            if ran.killed {
                self.killed = true;
            }
            executed.insert(index, ran.executed);
            self.board.publish(executed.clone());
        }
    }

    /// Run the first destroy event once with abort checks disabled
    fn shutdown(&mut self, started: Instant) {
        let Some(index) = self
            .events
            .iter()
            .position(|event| event.role() == EventRole::Destroy)
        else {
            return;
        };

        log::info!(target: LOG_TARGET, "Running destroy event");
        self.token.reset();
        self.env.set_exiting(false);

        let mut ctx = RunContext::new(
            &mut self.sandbox,
            &self.env,
            &self.token,
            started,
            0,
            self.sleep_poll,
        );
        let ran = interpret(self.events[index].commands_mut(), &mut ctx, false);

        let mut executed = (*self.board.snapshot()).clone();
        executed.insert(index, ran.executed);
        self.board.publish(executed);

        self.env.set_exiting(true);
        self.token.cancel();
    }
}

impl std::fmt::Debug for Run {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Run")
            .field("events", &self.events.len())
            .field("tick_period", &self.tick_period)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Commands executed for one event in one tick
#[derive(Debug, Default, PartialEq)]
pub struct Interpreted {
    pub executed: Vec<usize>,
    pub killed: bool,
}

/// Run one event's command list through the block-skip rules.
///
/// With `abort_responsive` unset the abort token is not checked between
/// commands, so a shutdown pass can complete.
pub fn interpret(
    commands: &mut [Command],
    ctx: &mut RunContext<'_>,
    abort_responsive: bool,
) -> Interpreted {
    let mut result = Interpreted::default();
    let mut index = 0;

    while index < commands.len() {
        if abort_responsive && ctx.is_stopping() {
            break;
        }

        result.executed.push(index);
        match run_guarded(&mut commands[index], ctx) {
            Signal::Kill => {
                log::info!(
                    target: LOG_TARGET,
                    "{} ended the program",
                    commands[index].kind()
                );
                ctx.token().cancel();
                result.killed = true;
                break;
            }
            Signal::Exit => break,
            Signal::Skip => index = skip_block(commands, index),
            Signal::Continue => {
                let else_follows = commands
                    .get(index + 1)
                    .is_some_and(|next| next.structure() == Structure::Else);
                if else_follows {
                    index = skip_block(commands, index + 1);
                }
            }
        }
        index += 1;
    }

    result
}

/// A panicking command is logged and treated as a false condition
fn run_guarded(command: &mut Command, ctx: &mut RunContext<'_>) -> Signal {
    let kind = command.kind().to_string();
    match panic::catch_unwind(AssertUnwindSafe(|| command.run(ctx))) {
        Ok(signal) => {
            log::trace!(target: LOG_TARGET, "{kind} -> {signal:?}");
            signal
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!(target: LOG_TARGET, "{kind} panicked: {message}");
            Signal::Skip
        }
    }
}

/// Index of the last command guarded by the condition at `from`.
///
/// If a block opens right after `from`, returns the index of its matching end
/// marker, or the last index when the block is never closed. Otherwise nothing
/// is guarded and `from` itself is returned.
pub fn skip_block(commands: &[Command], from: usize) -> usize {
    let mut depth = 0usize;

    for (index, command) in commands.iter().enumerate().skip(from + 1) {
        match command.structure() {
            Structure::StartBlock => depth += 1,
            Structure::EndBlock if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return index;
                }
            }
            _ if depth == 0 => return from,
            _ => {}
        }
    }

    if depth > 0 {
        commands.len() - 1
    } else {
        from
    }
}
