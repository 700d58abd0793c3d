use serde::{Deserialize, Serialize};

/// Coarse lifecycle state derived from a Grid Engine status token.
///
/// Only `Running` and `Error` change what the monitor does. `Waiting` and
/// `Unknown` both mean the job is left alone until it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Running,
    Waiting,
    Error,
    Unknown,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Running => "running",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Error => "error",
            LifecycleState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw status token to its lifecycle state.
///
/// Total over every input: tokens outside the table, and a missing token,
/// classify as `Unknown`.
pub fn classify(token: Option<&str>) -> LifecycleState {
    match token {
        Some("r") => LifecycleState::Running,
        Some("qw") => LifecycleState::Waiting,
        // never started; will not leave the queue on its own
        Some("Eqw") => LifecycleState::Error,
        // "t" (transferring) and "dr" (deleted while running) resolve by themselves
        Some("t") | Some("dr") => LifecycleState::Unknown,
        _ => LifecycleState::Unknown,
    }
}
