//! Events and commands: the units a loaded script is made of
//!
//! A [`Command`] wraps an [`Action`] (what the command does) together with the
//! kind tag and parameters it was built from. An [`Event`] wraps a [`Trigger`]
//! (when the event is active) and its ordered command list.

use crate::error::LoadError;
use crate::runtime::context::RunContext;
use serde::{Deserialize, Serialize};

pub mod commands;
pub mod events;
pub mod params;
pub mod registry;

pub use params::Parameters;
pub use registry::Registry;

/// Outcome of running one command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Proceed normally (a `true` result or no explicit signal)
    Continue,
    /// The condition was false: skip the guarded block
    Skip,
    /// Stop processing this event for the current tick
    Exit,
    /// Abort the whole run
    Kill,
}

impl From<bool> for Signal {
    fn from(value: bool) -> Self {
        if value { Signal::Continue } else { Signal::Skip }
    }
}

/// Structural role of a command in the flat command list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Structure {
    #[default]
    Plain,
    StartBlock,
    EndBlock,
    Else,
}

/// Behavior of a command
pub trait Action: Send {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal;

    fn structure(&self) -> Structure {
        Structure::Plain
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventRole {
    #[default]
    Regular,
    /// Runs once at shutdown instead of being polled
    Destroy,
}

/// Activation condition of an event, evaluated once per tick
pub trait Trigger: Send {
    fn is_active(&mut self, ctx: &mut RunContext<'_>) -> bool;

    fn role(&self) -> EventRole {
        EventRole::Regular
    }
}

/// A constructed value plus the non-fatal problems found while building it
#[derive(Debug)]
pub struct Built<T> {
    pub value: T,
    pub errors: Vec<LoadError>,
}

impl<T> Built<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(value: T, errors: Vec<LoadError>) -> Self {
        Self { value, errors }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Built<U> {
        Built {
            value: f(self.value),
            errors: self.errors,
        }
    }
}

pub struct Command {
    kind: String,
    parameters: Parameters,
    action: Box<dyn Action>,
}

impl Command {
    pub fn new(kind: impl Into<String>, parameters: Parameters, action: Box<dyn Action>) -> Self {
        Self {
            kind: kind.into(),
            parameters,
            action,
        }
    }

    /// Placeholder for a command whose parameters were rejected. It keeps its
    /// place in the list and acts as a false condition, so a block it guards
    /// never runs.
    pub fn rejected(kind: impl Into<String>, parameters: Parameters) -> Self {
        Self::new(kind, parameters, Box::new(commands::Rejected))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn structure(&self) -> Structure {
        self.action.structure()
    }

    pub fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        self.action.run(ctx)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .finish()
    }
}

pub struct Event {
    kind: String,
    parameters: Parameters,
    trigger: Box<dyn Trigger>,
    commands: Vec<Command>,
}

impl Event {
    pub fn new(kind: impl Into<String>, parameters: Parameters, trigger: Box<dyn Trigger>) -> Self {
        Self {
            kind: kind.into(),
            parameters,
            trigger,
            commands: Vec::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn role(&self) -> EventRole {
        self.trigger.role()
    }

    pub fn is_active(&mut self, ctx: &mut RunContext<'_>) -> bool {
        self.trigger.is_active(ctx)
    }

    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut [Command] {
        &mut self.commands
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("commands", &self.commands)
            .finish()
    }
}
