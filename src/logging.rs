//! Minimal stderr backend for the `log` facade
//!
//! The library only emits records through `log`. Binaries and tests that want
//! to see them install [`DebugLogger`], which is configured from the
//! `ARMSCRIPT_LOG` environment variable.

use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable holding the maximum log level
pub const LOG_ENV: &str = "ARMSCRIPT_LOG";

/// Writes `[LEVEL] target message` lines to stderr
#[derive(Debug, Clone)]
pub struct DebugLogger {
    level: LevelFilter,
    /// Only records whose target starts with this prefix are written
    prefix: Option<String>,
}

impl Default for DebugLogger {
    fn default() -> Self {
        Self {
            level: level_from_env().unwrap_or(LevelFilter::Info),
            prefix: Some("armscript".to_string()),
        }
    }
}

impl DebugLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Also show records from other crates
    pub fn all_targets(mut self) -> Self {
        self.prefix = None;
        self
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Install as the global logger. Fails if a logger is already set.
    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
            && self
                .prefix
                .as_deref()
                .is_none_or(|prefix| metadata.target().starts_with(prefix))
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", format_record(record));
        }
    }

    fn flush(&self) {}
}

fn format_record(record: &Record<'_>) -> String {
    format!(
        "[{}] {:18} {}",
        record.level(),
        record.target(),
        record.args()
    )
}

fn level_from_env() -> Option<LevelFilter> {
    parse_level(&std::env::var(LOG_ENV).ok()?)
}

/// Parse `trace|debug|info|warn|error|off`, case-insensitive
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}
