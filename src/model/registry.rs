//! Closed registry from kind tags to constructors

use super::{Action, Built, Command, Event, Parameters, Trigger, commands, events};
use crate::error::{LoadError, RegistryError};
use std::collections::HashMap;

/// Constructor for a command kind
pub type ActionFactory = fn(&Parameters) -> Result<Built<Box<dyn Action>>, LoadError>;

/// Constructor for an event kind
pub type TriggerFactory = fn(&Parameters) -> Result<Built<Box<dyn Trigger>>, LoadError>;

/// Registry of available event and command kinds
#[derive(Default)]
pub struct Registry {
    commands: HashMap<String, ActionFactory>,
    events: HashMap<String, TriggerFactory>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in event and command kind
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (tag, factory) in commands::BUILTINS {
            registry.commands.insert((*tag).to_string(), *factory);
        }
        for (tag, factory) in events::BUILTINS {
            registry.events.insert((*tag).to_string(), *factory);
        }
        registry
    }

    pub fn register_command(
        &mut self,
        tag: impl Into<String>,
        factory: ActionFactory,
    ) -> Result<(), RegistryError> {
        let tag = validate_tag(tag.into())?;
        if self.commands.contains_key(&tag) {
            return Err(RegistryError::Duplicate {
                tag,
                category: "command",
            });
        }
        log::debug!(target: "armscript::loader", "Registering command kind: {tag}");
        self.commands.insert(tag, factory);
        Ok(())
    }

    pub fn register_event(
        &mut self,
        tag: impl Into<String>,
        factory: TriggerFactory,
    ) -> Result<(), RegistryError> {
        let tag = validate_tag(tag.into())?;
        if self.events.contains_key(&tag) {
            return Err(RegistryError::Duplicate {
                tag,
                category: "event",
            });
        }
        log::debug!(target: "armscript::loader", "Registering event kind: {tag}");
        self.events.insert(tag, factory);
        Ok(())
    }

    pub fn build_command(
        &self,
        tag: &str,
        parameters: &Parameters,
    ) -> Result<Built<Command>, LoadError> {
        let factory = self
            .commands
            .get(tag)
            .ok_or(LoadError::UnknownCommandKind)?;
        Ok(factory(parameters)?.map(|action| Command::new(tag, parameters.clone(), action)))
    }

    pub fn build_event(
        &self,
        tag: &str,
        parameters: &Parameters,
    ) -> Result<Built<Event>, LoadError> {
        let factory = self.events.get(tag).ok_or(LoadError::UnknownEventKind)?;
        Ok(factory(parameters)?.map(|trigger| Event::new(tag, parameters.clone(), trigger)))
    }

    /// Registered command tags, sorted
    pub fn command_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Registered event tags, sorted
    pub fn event_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.events.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

fn validate_tag(tag: String) -> Result<String, RegistryError> {
    if tag.trim().is_empty() {
        return Err(RegistryError::EmptyTag);
    }
    Ok(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Signal;
    use crate::runtime::context::RunContext;

    struct Noop;

    impl Action for Noop {
        fn run(&mut self, _ctx: &mut RunContext<'_>) -> Signal {
            Signal::Continue
        }
    }

    fn noop(_: &Parameters) -> Result<Built<Box<dyn Action>>, LoadError> {
        Ok(Built::ok(Box::new(Noop)))
    }

    #[test]
    fn builtins_are_registered() {
        let registry = Registry::with_builtins();
        assert!(registry.command_kinds().contains(&"StartBlockCommand"));
        assert!(registry.command_kinds().contains(&"EndProgramCommand"));
        assert!(registry.event_kinds().contains(&"DestroyEvent"));
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let mut registry = Registry::with_builtins();
        let err = registry
            .register_command("ScriptCommand", noop)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                tag: "ScriptCommand".to_string(),
                category: "command"
            }
        );

        assert!(registry.register_command("NoopCommand", noop).is_ok());
        assert!(registry.register_command("NoopCommand", noop).is_err());
        assert_eq!(registry.register_command(" ", noop), Err(RegistryError::EmptyTag));
    }

    #[test]
    fn unknown_tags_fail_to_build() {
        let registry = Registry::new();
        let params = Parameters::new();
        assert_eq!(
            registry.build_command("Nope", &params).unwrap_err(),
            LoadError::UnknownCommandKind
        );
        assert_eq!(
            registry.build_event("Nope", &params).unwrap_err(),
            LoadError::UnknownEventKind
        );
    }

    #[test]
    fn custom_kinds_build() {
        let mut registry = Registry::new();
        registry.register_command("NoopCommand", noop).unwrap();
        let built = registry.build_command("NoopCommand", &Parameters::new()).unwrap();
        assert_eq!(built.value.kind(), "NoopCommand");
        assert!(built.errors.is_empty());
    }
}
