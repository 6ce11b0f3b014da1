//! Command-line front end: dry-running and checking script files

pub mod check;
pub mod run;

use crate::loader::LoadReport;
use crate::storage::{JsonFileSource, ScriptSource};
use crate::types::Script;
use std::path::Path;

/// Read a JSON script file from a blocking context
pub fn read_script(path: &Path) -> anyhow::Result<Script> {
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let source = JsonFileSource::new(path);
    Ok(runtime.block_on(source.load())?)
}

/// Render a load report, one line per error
pub fn format_report(report: &LoadReport) -> String {
    if report.is_empty() {
        return "No load errors".to_string();
    }
    report
        .iter()
        .map(|(err, kinds)| format!("  {err}: {}", kinds.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}
