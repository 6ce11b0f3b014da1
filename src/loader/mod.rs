//! Builds the executable model from a serialized script
//!
//! Loading never aborts. Every problem is recorded in the returned
//! [`LoadReport`] and the rest of the script is still loaded:
//! - an unknown event kind drops the event together with its commands
//! - an unknown command kind drops that command only
//! - a constructor that fails outright drops its event; a command is replaced
//!   by a [`Command::rejected`] placeholder that skips whatever block it guards
//! - non-fatal problems (such as an expression that does not compile) are
//!   recorded while the event or command is still added

use crate::error::LoadError;
use crate::model::{Built, Command, Event, Registry};
use crate::types::Script;
use std::collections::BTreeMap;


const LOG_TARGET: &str = "armscript::loader";

/// Load errors mapped to the kind tags that produced them, in load order
pub type LoadReport = BTreeMap<LoadError, Vec<String>>;

/// Result of [`load`]
#[derive(Debug, Default)]
pub struct LoadedScript {
    pub events: Vec<Event>,
    pub errors: LoadReport,
}

impl LoadedScript {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Build every event and command of `script` through `registry`
pub fn load(script: &Script, registry: &Registry) -> LoadedScript {
    let mut loaded = LoadedScript::default();

    for descriptor in &script.events {
        let mut event = match registry.build_event(&descriptor.kind, &descriptor.parameters) {
            Ok(built) => take(built, &descriptor.kind, &mut loaded.errors),
            Err(err) => {
                log::warn!(target: LOG_TARGET, "Skipping event {}: {err}", descriptor.kind);
                record(&mut loaded.errors, err, &descriptor.kind);
                continue;
            }
        };

        for command in &descriptor.command_list {
            match registry.build_command(&command.kind, &command.parameters) {
                Ok(built) => event.add_command(take(built, &command.kind, &mut loaded.errors)),
                Err(err @ LoadError::UnknownCommandKind) => {
                    log::warn!(target: LOG_TARGET, "Skipping command {}: {err}", command.kind);
                    record(&mut loaded.errors, err, &command.kind);
                }
                Err(err) => {
                    log::warn!(target: LOG_TARGET, "Disabling command {}: {err}", command.kind);
                    record(&mut loaded.errors, err, &command.kind);
                    event.add_command(Command::rejected(&command.kind, command.parameters.clone()));
                }
            }
        }

        log::debug!(
            target: LOG_TARGET,
            "Loaded {} with {} command(s)",
            event.kind(),
            event.commands().len()
        );
        loaded.events.push(event);
    }

    log::info!(
        target: LOG_TARGET,
        "Loaded {} of {} event(s), {} error kind(s)",
        loaded.events.len(),
        script.events.len(),
        loaded.errors.len()
    );
    loaded
}

fn take<T>(built: Built<T>, kind: &str, report: &mut LoadReport) -> T {
    for err in built.errors {
        log::warn!(target: LOG_TARGET, "{kind}: {err}");
        record(report, err, kind);
    }
    built.value
}

fn record(report: &mut LoadReport, err: LoadError, kind: &str) {
    report.entry(err).or_default().push(kind.to_string());
}
