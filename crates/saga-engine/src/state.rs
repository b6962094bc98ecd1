use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a saga run in its lifecycle.
///
/// A single value captures where the run is: which forward step is in
/// flight, or which completed step is being compensated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    RunningForward(usize),
    Compensating(usize),
    Succeeded,
    Failed,
}

impl RunState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// State after forward step `index` succeeded in a saga of `len` steps.
    #[must_use]
    pub(crate) fn after_success(index: usize, len: usize) -> Self {
        if index + 1 < len {
            Self::RunningForward(index + 1)
        } else {
            Self::Succeeded
        }
    }

    /// State after forward step `index` failed: unwind from the step before it.
    #[must_use]
    pub(crate) fn after_failure(index: usize) -> Self {
        match index.checked_sub(1) {
            Some(previous) => Self::Compensating(previous),
            None => Self::Failed,
        }
    }

    /// State after the compensation of step `index` resolved, whatever its result.
    #[must_use]
    pub(crate) fn after_compensation(index: usize) -> Self {
        Self::after_failure(index)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not-started"),
            Self::RunningForward(index) => write!(f, "running-forward({index})"),
            Self::Compensating(index) => write!(f, "compensating({index})"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed => f.write_str("failed"),
        }
    }
}
