//! Update modes and per-run flow states.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// How an update run chooses its fetch window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Only messages after the owner's cursor
    #[default]
    Incremental,
    /// Reset the owner, then reprocess the entire history
    Full,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Incremental => "incremental",
            UpdateMode::Full => "full",
        }
    }
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateMode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incremental" => Ok(UpdateMode::Incremental),
            "full" => Ok(UpdateMode::Full),
            other => Err(ServiceError::InvalidRequest(format!(
                "unknown update mode '{}', expected incremental or full",
                other
            ))),
        }
    }
}

/// Stage of an update run.
///
/// `Idle -> Fetching -> Extracting <-> Persisting -> Projecting -> Done`,
/// with `Failed` reachable from any stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Idle,
    Fetching,
    Extracting,
    Persisting,
    Projecting,
    Done,
    Failed,
}

impl FlowState {
    /// True once a run has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Done | FlowState::Failed)
    }
}
