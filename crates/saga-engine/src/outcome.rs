use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RunContext;
use crate::error::{CompensationFailure, StepFailure};
use crate::state::RunState;

/// Identity of one saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How the compensation of one completed step resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[non_exhaustive]
pub enum CompensationStatus {
    /// The compensating action succeeded.
    Compensated { attempts: u32 },
    /// The step registers no compensating action.
    Skipped,
    /// The compensating action failed on every allowed attempt.
    Failed { failure: CompensationFailure },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompensationRecord {
    pub index: usize,
    pub step: String,
    #[serde(flatten)]
    pub status: CompensationStatus,
}

/// Final report of a saga run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TerminalOutcome {
    /// Every step completed.
    Succeeded {
        run_id: RunId,
        context: RunContext,
    },
    /// A step failed and all completed steps were unwound, newest first.
    Failed {
        run_id: RunId,
        cause: StepFailure,
        compensation_log: Vec<CompensationRecord>,
        context: RunContext,
    },
}

impl TerminalOutcome {
    #[must_use]
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Succeeded { run_id, .. } | Self::Failed { run_id, .. } => *run_id,
        }
    }

    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        match self {
            Self::Succeeded { .. } => RunState::Succeeded,
            Self::Failed { .. } => RunState::Failed,
        }
    }

    #[must_use]
    pub fn context(&self) -> &RunContext {
        match self {
            Self::Succeeded { context, .. } | Self::Failed { context, .. } => context,
        }
    }

    /// The failure that drove the run into compensation, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&StepFailure> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { cause, .. } => Some(cause),
        }
    }

    #[must_use]
    pub fn compensation_log(&self) -> &[CompensationRecord] {
        match self {
            Self::Succeeded { .. } => &[],
            Self::Failed {
                compensation_log, ..
            } => compensation_log,
        }
    }

    /// Compensations that left an external side effect un-reverted.
    pub fn compensation_failures(&self) -> impl Iterator<Item = &CompensationFailure> {
        self.compensation_log()
            .iter()
            .filter_map(|record| match &record.status {
                CompensationStatus::Failed { failure } => Some(failure),
                _ => None,
            })
    }
}
