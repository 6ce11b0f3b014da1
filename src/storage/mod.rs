//! Script sources
//!
//! The loader only sees an in-memory [`Script`]. Sources turn a serialization
//! medium into one: a JSON file on disk, or JSON text held in memory.

use crate::error::StorageError;
use crate::types::Script;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Somewhere a script can be read from and written to
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn load(&self) -> Result<Script, StorageError>;

    async fn save(&self, script: &Script) -> Result<(), StorageError>;

    /// Human-readable location for diagnostics
    fn describe(&self) -> String;
}

/// Script stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ScriptSource for JsonFileSource {
    async fn load(&self) -> Result<Script, StorageError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        let script = parse(&content)?;
        log::debug!(
            target: "armscript::loader",
            "Read {} event(s) from {}",
            script.events.len(),
            self.path.display()
        );
        Ok(script)
    }

    async fn save(&self, script: &Script) -> Result<(), StorageError> {
        let content = render(script)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| self.io_error(e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Script held as JSON text in memory
#[derive(Debug, Default)]
pub struct MemorySource {
    content: Mutex<String>,
}

impl MemorySource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(content.into()),
        }
    }

    /// Current JSON text
    pub fn content(&self) -> String {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ScriptSource for MemorySource {
    async fn load(&self) -> Result<Script, StorageError> {
        parse(&self.content())
    }

    async fn save(&self, script: &Script) -> Result<(), StorageError> {
        let content = render(script)?;
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = content;
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

fn parse(content: &str) -> Result<Script, StorageError> {
    serde_json::from_str(content).map_err(|source| StorageError::Format { source })
}

fn render(script: &Script) -> Result<String, StorageError> {
    serde_json::to_string_pretty(script).map_err(|source| StorageError::Format { source })
}

/// Serialize a script to pretty-printed JSON
pub fn to_json(script: &Script) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(script)?)
}

/// Deserialize a script from JSON
pub fn from_json(json: &str) -> anyhow::Result<Script> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandDescriptor, EventDescriptor};

    fn sample() -> Script {
        Script::new(vec![
            EventDescriptor::new("StepEvent")
                .command(CommandDescriptor::new("SleepCommand").param("seconds", 0.5)),
        ])
    }

    #[test]
    fn json_helpers_preserve_script() {
        let json = to_json(&sample()).unwrap();
        assert_eq!(from_json(&json).unwrap(), sample());
        assert!(from_json("{ not json").is_err());
    }

    #[tokio::test]
    async fn memory_source_saves_and_loads() {
        let source = MemorySource::new("[]");
        assert!(source.load().await.unwrap().is_empty());

        source.save(&sample()).await.unwrap();
        assert!(source.content().contains("SleepCommand"));
        assert_eq!(source.load().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn memory_source_reports_format_errors() {
        let source = MemorySource::new(r#"[{ "parameters": {} }]"#);
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Format { .. }));
    }

    #[tokio::test]
    async fn file_source_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "armscript-storage-{}.json",
            std::process::id()
        ));
        let source = JsonFileSource::new(&path);
        source.save(&sample()).await.unwrap();
        assert_eq!(source.load().await.unwrap(), sample());
        tokio::fs::remove_file(&path).await.unwrap();

        let err = source.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(err.to_string().contains("armscript-storage"));
    }
}
