//! Status snapshots shared between the worker and its controller

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Event index to the indices of the commands executed for it in the latest tick
pub type StatusMap = BTreeMap<usize, Vec<usize>>;

/// What [`crate::Interpreter::status`] reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    NotRunning,
    Running(Arc<StatusMap>),
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running(_))
    }

    /// Executed commands of the latest tick, if running
    pub fn snapshot(&self) -> Option<&StatusMap> {
        match self {
            RunStatus::Running(map) => Some(map),
            RunStatus::NotRunning => None,
        }
    }
}

/// Latest published snapshot. Snapshots are replaced wholesale, never mutated
/// in place, so readers hold a consistent map for as long as they like.
#[derive(Debug, Default)]
pub struct StatusBoard {
    current: Mutex<Arc<StatusMap>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, map: StatusMap) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(map);
    }

    pub fn snapshot(&self) -> Arc<StatusMap> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.publish(StatusMap::new());
    }
}
