//! # armscript
//!
//! An event-triggered command interpreter for scripting a robot arm.
//!
//! A script is an ordered list of events. Each event has a trigger (run once at
//! start, every tick, on a timer, while an expression holds, ...) and a flat
//! list of commands. Conditional commands guard the block that follows them,
//! delimited by start/end block markers, with an optional else block. The
//! interpreter polls every event at a fixed tick rate on its own thread and
//! can be stopped at any time, even while a command is waiting on the robot.
//!
//! User expressions and scripts run in a sandboxed [Rhai](https://rhai.rs)
//! engine that only exposes arithmetic, collection utilities, a math subset,
//! and handles to the robot and vision collaborators.
//!
//! ## Quick Start
//!
//! ```rust
//! use armscript::{Environment, Interpreter, Script};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let script: Script = serde_json::from_str(r#"[
//!     { "type": "InitEvent", "parameters": {}, "commandList": [
//!         { "type": "SetVariableCommand",
//!           "parameters": { "variable": "count", "expression": "0" } }
//!     ] },
//!     { "type": "StepEvent", "parameters": {}, "commandList": [
//!         { "type": "SetVariableCommand",
//!           "parameters": { "variable": "count", "expression": "count + 1" } },
//!         { "type": "TestVariableCommand",
//!           "parameters": { "variable": "count", "test": ">=", "expression": "3" } },
//!         { "type": "StartBlockCommand", "parameters": {} },
//!         { "type": "EndProgramCommand", "parameters": {} },
//!         { "type": "EndBlockCommand", "parameters": {} }
//!     ] }
//! ]"#)?;
//!
//! let mut interpreter = Interpreter::new(Environment::simulated());
//! let report = interpreter.load_script(&script)?;
//! assert!(report.is_empty());
//!
//! interpreter.start(true)?;
//! interpreter.wait(None);
//! let summary = interpreter.stop()?;
//! assert!(summary.killed);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod loader;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod sandbox;
pub mod storage;
pub mod types;

pub use collaborators::{Environment, Position, Robot, Vision};
pub use config::{InterpreterConfig, SandboxConfig};
pub use error::{LifecycleError, LoadError, RegistryError, SandboxError, StorageError};
pub use interpreter::{Interpreter, StopHandle};
pub use loader::{LoadReport, LoadedScript, load};
pub use model::{Registry, Signal};
pub use runtime::RunSummary;
pub use runtime::cancel::CancelToken;
pub use runtime::status::{RunStatus, StatusMap};
pub use sandbox::Sandbox;
pub use types::{CommandDescriptor, EventDescriptor, Script};
