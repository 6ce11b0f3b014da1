//! Serialized form of a script

use crate::model::Parameters;
use serde::{Deserialize, Serialize};

/// A whole script: the ordered list of its events.
///
/// Serializes as a bare JSON array of event descriptors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub events: Vec<EventDescriptor>,
}

impl Script {
    pub fn new(events: Vec<EventDescriptor>) -> Self {
        Self { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total number of commands across all events
    pub fn command_count(&self) -> usize {
        self.events.iter().map(|e| e.command_list.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    #[serde(rename = "type", alias = "typeLogic")]
    pub kind: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(rename = "commandList", default)]
    pub command_list: Vec<CommandDescriptor>,
}

impl EventDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: Parameters::new(),
            command_list: Vec::new(),
        }
    }

    /// Builder-style parameter setter
    pub fn param(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn command(mut self, command: CommandDescriptor) -> Self {
        self.command_list.push(command);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    #[serde(rename = "type", alias = "typeLogic")]
    pub kind: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl CommandDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_legacy_field_name() {
        let json = r#"[
            {
                "typeLogic": "StepEvent",
                "parameters": {},
                "commandList": [
                    { "typeLogic": "SleepCommand", "parameters": { "seconds": 1 } }
                ]
            }
        ]"#;
        let script: Script = serde_json::from_str(json).unwrap();
        assert_eq!(script.events.len(), 1);
        assert_eq!(script.events[0].kind, "StepEvent");
        assert_eq!(script.events[0].command_list[0].kind, "SleepCommand");
        assert_eq!(script.command_count(), 1);
    }

    #[test]
    fn serializes_as_array_with_type_field() {
        let script = Script::new(vec![
            EventDescriptor::new("InitEvent")
                .command(CommandDescriptor::new("PrintCommand").param("expression", "1")),
        ]);
        let value = serde_json::to_value(&script).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["type"], "InitEvent");
        assert_eq!(value[0]["commandList"][0]["parameters"]["expression"], "1");
    }

    #[test]
    fn missing_parameters_default_to_empty() {
        let script: Script =
            serde_json::from_str(r#"[{ "type": "StepEvent", "commandList": [{ "type": "EndProgramCommand" }] }]"#)
                .unwrap();
        assert!(script.events[0].parameters.is_empty());
        assert!(script.events[0].command_list[0].parameters.is_empty());
    }
}
