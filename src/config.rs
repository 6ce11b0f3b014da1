//! Interpreter configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`InterpreterConfig::tick_rate`]
pub const TICK_RATE_ENV: &str = "ARMSCRIPT_TICK_RATE";

/// Runtime configuration for the interpreter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Event polling rate in ticks per second
    pub tick_rate: u32,
    /// How often `stop()` checks whether the script thread has exited (ms)
    pub stop_poll_ms: u64,
    /// Polling interval for abort-aware sleeps (ms), at most 100
    pub sleep_poll_ms: u64,
    /// Robot speed applied at every start
    pub default_speed: f64,
    /// Stack size of the script thread in bytes, platform default when unset
    pub worker_stack_size: Option<usize>,
    /// Evaluator limits
    pub sandbox: SandboxConfig,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            tick_rate: 50,
            stop_poll_ms: 50,
            sleep_poll_ms: 50,
            default_speed: 10.0,
            worker_stack_size: None,
            sandbox: SandboxConfig::default(),
        }
    }
}

impl InterpreterConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(TICK_RATE_ENV) {
            match value.parse::<u32>() {
                Ok(rate) if rate > 0 => self.tick_rate = rate,
                _ => log::warn!("Ignoring invalid {TICK_RATE_ENV}={value}"),
            }
        }
        self
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_ms.max(1))
    }

    pub fn sleep_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_poll_ms.clamp(1, 100))
    }
}

/// Resource limits for the expression evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum operations per evaluation, 0 for unlimited
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_string_size: 65_536,
            max_array_size: 10_000,
            max_map_size: 10_000,
        }
    }
}
