//! Serializable data types of the public API
//!
//! - Script: the on-disk form of a script (events and their command lists)

pub mod script;

pub use script::{CommandDescriptor, EventDescriptor, Script};
