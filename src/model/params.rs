//! Typed access to the JSON parameter mapping of an event or command

use crate::error::LoadError;
use crate::model::Built;
use crate::sandbox;
use serde_json::Value;

pub type Parameters = serde_json::Map<String, Value>;

pub fn required_str(params: &Parameters, name: &str) -> Result<String, LoadError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(LoadError::missing(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(LoadError::invalid(name, "expected a string")),
    }
}

/// Numbers may be given as JSON numbers or numeric strings
pub fn required_f64(params: &Parameters, name: &str) -> Result<f64, LoadError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(LoadError::missing(name)),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| LoadError::invalid(name, "number out of range")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| LoadError::invalid(name, format!("'{s}' is not a number"))),
        Some(_) => Err(LoadError::invalid(name, "expected a number")),
    }
}

pub fn optional_bool(params: &Parameters, name: &str, default: bool) -> Result<bool, LoadError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => s
            .trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| LoadError::invalid(name, format!("'{s}' is not a boolean"))),
        Some(_) => Err(LoadError::invalid(name, "expected a boolean")),
    }
}

/// A required expression. A parse failure is reported but does not reject the
/// command, so the rest of the script still loads.
pub fn expression(params: &Parameters, name: &str) -> Result<Built<String>, LoadError> {
    let source = required_str(params, name)?;
    Ok(match sandbox::check_expression(&source) {
        Ok(()) => Built::ok(source),
        Err(reason) => Built::with_errors(source, vec![LoadError::expression(name, reason)]),
    })
}

/// Like [`expression`], for multi-statement scripts
pub fn script(params: &Parameters, name: &str) -> Result<Built<String>, LoadError> {
    let source = required_str(params, name)?;
    Ok(match sandbox::check_script(&source) {
        Ok(()) => Built::ok(source),
        Err(reason) => Built::with_errors(source, vec![LoadError::expression(name, reason)]),
    })
}

pub fn variable_name(params: &Parameters, name: &str) -> Result<String, LoadError> {
    let variable = required_str(params, name)?;
    if !sandbox::is_identifier(&variable) {
        return Err(LoadError::invalid(
            name,
            format!("'{variable}' is not a valid variable name"),
        ));
    }
    Ok(variable)
}
