//! Worker identity and lifecycle states.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Worker lifecycle state.
///
/// `Uninstalled → Installing → Installed → Activating → Active`, and
/// `Redundant` once a newer worker takes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Uninstalled,
    /// Install signal dispatched; static assets being cached.
    Installing,
    /// Installed and waiting to activate.
    Installed,
    /// Activate signal dispatched; clients being claimed, stale caches purged.
    Activating,
    /// Controlling pages and intercepting fetches.
    Active,
    /// Superseded by a newer worker.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(self) -> bool {
        self == WorkerState::Active
    }

    pub fn is_terminal(self) -> bool {
        self == WorkerState::Redundant
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = WorkerId::next();
        let b = WorkerId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_only_active_intercepts() {
        assert!(WorkerState::Active.can_intercept_fetch());
        assert!(!WorkerState::Installed.can_intercept_fetch());
        assert!(!WorkerState::Activating.can_intercept_fetch());
        assert!(WorkerState::Redundant.is_terminal());
    }

    #[test]
    fn test_state_serde() {
        assert_eq!(serde_json::to_string(&WorkerState::Active).unwrap(), "\"active\"");
        assert_eq!(WorkerState::Installing.to_string(), "installing");
    }
}
