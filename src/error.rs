//! Error types for every layer of the interpreter

use std::path::PathBuf;
use thiserror::Error;

/// A problem found while turning a script descriptor into live events and commands.
///
/// Load errors never abort a load. They are collected into a
/// [`LoadReport`](crate::loader::LoadReport) keyed by the error itself, with the
/// offending kind tags as values.
#[derive(Debug, Error, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoadError {
    #[error("Unknown event kind")]
    UnknownEventKind,

    #[error("Unknown command kind")]
    UnknownCommandKind,

    #[error("Missing parameter '{name}'")]
    MissingParameter { name: String },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid expression in '{name}': {reason}")]
    InvalidExpression { name: String, reason: String },
}

impl LoadError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn expression(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExpression {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Registration problems in the kind registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Kind '{tag}' is already registered as {category}")]
    Duplicate { tag: String, category: &'static str },

    #[error("Kind tag must not be empty")]
    EmptyTag,
}

/// Failures inside the sandboxed evaluator
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SandboxError {
    #[error("evaluation failed: {message}")]
    Evaluation { message: String },

    #[error("expression produced no value")]
    NoValue,

    #[error("'{name}' is read-only")]
    ReadOnly { name: String },

    #[error("'{name}' is not a valid variable name")]
    InvalidName { name: String },
}

impl SandboxError {
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }
}

/// Misuse of the start/stop lifecycle
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("a script is already running")]
    AlreadyRunning,

    #[error("no script is running")]
    NotRunning,

    #[error("failed to spawn the script thread: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("the script thread panicked")]
    WorkerPanicked,
}

/// Errors raised by script sources
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid script format: {source}")]
    Format {
        #[source]
        source: serde_json::Error,
    },
}
