//! `armscript run`: execute a script against the simulated collaborators

use crate::collaborators::Environment;
use crate::config::InterpreterConfig;
use crate::interpreter::Interpreter;
use crate::runtime::RunSummary;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub script: PathBuf,
    pub config: Option<PathBuf>,
    /// Stop after this long; `None` runs until the script ends itself
    pub duration: Option<Duration>,
}

pub fn run_script(options: &RunOptions) -> anyhow::Result<RunSummary> {
    let config = match &options.config {
        Some(path) => InterpreterConfig::from_json_file(path)?,
        None => InterpreterConfig::default(),
    }
    .with_env_overrides();

    let script = super::read_script(&options.script)?;
    let mut interpreter = Interpreter::with_config(Environment::simulated(), config);
    let report = interpreter.load_script(&script)?;
    println!("{}", super::format_report(&report));

    interpreter.start(true)?;
    if !interpreter.wait(options.duration) {
        log::info!(target: "armscript::engine", "Time limit reached, stopping");
    }
    let summary = interpreter.stop()?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(summary)
}
