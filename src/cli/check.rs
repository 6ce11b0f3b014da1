//! `armscript check`: load a script without running it

use crate::collaborators::Environment;
use crate::interpreter::Interpreter;
use std::path::Path;

/// Load `path` and print the report. Returns whether the script loaded cleanly.
pub fn run_check(path: &Path) -> anyhow::Result<bool> {
    let script = super::read_script(path)?;
    let mut interpreter = Interpreter::new(Environment::simulated());
    let report = interpreter.load_script(&script)?;

    println!(
        "{}: {} event(s), {} command(s), {} loaded",
        path.display(),
        script.events.len(),
        script.command_count(),
        interpreter.event_count()
    );
    println!("{}", super::format_report(&report));
    Ok(report.is_empty())
}
