use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::outcome::RunId;

/// Failure detail reported by an action, or synthesized by the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}{}", .code.as_ref().map(|code| format!(" (code: {code})")).unwrap_or_default())]
pub struct ActionError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Optional machine-readable error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ActionError {
    /// Code attached to attempts abandoned by the per-call timeout.
    pub const TIMEOUT_CODE: &'static str = "timeout";

    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn timed_out(after: Duration) -> Self {
        Self::new(format!("call did not complete within {after:?}")).with_code(Self::TIMEOUT_CODE)
    }

    /// Code attached to attempts whose action panicked.
    pub const PANIC_CODE: &'static str = "panic";

    #[must_use]
    pub fn panicked(message: &str) -> Self {
        Self::new(format!("action panicked: {message}")).with_code(Self::PANIC_CODE)
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.code.as_deref() == Some(Self::TIMEOUT_CODE)
    }
}

/// A run context key was written twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("context key '{key}' already holds a value")]
pub struct DuplicateKeyError {
    /// The key that was already populated.
    pub key: String,
}

/// An invalid saga definition, rejected before any action is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DefinitionError {
    #[error("saga '{saga}' has no steps")]
    NoSteps { saga: String },

    #[error("output key '{key}' is declared by both '{first}' and '{second}'")]
    DuplicateOutputKey {
        key: String,
        first: String,
        second: String,
    },

    #[error("retry policy for step '{step}' must allow at least one attempt")]
    InvalidMaxAttempts { step: String },

    #[error("retry policy for step '{step}' has min delay {min:?} above max delay {max:?}")]
    InvalidBackoff {
        step: String,
        min: Duration,
        max: Duration,
    },

    #[error("step #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("saga '{saga}' has a zero timeout")]
    ZeroTimeout { saga: String },

    #[error("step '{step}' refers to unknown capability '{capability}'")]
    UnknownCapability { step: String, capability: String },
}

/// Why a forward step was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum StepFailure {
    /// The action reported failure on every allowed attempt.
    #[error("step '{step}' failed after {attempts} attempt(s)")]
    Action {
        step: String,
        index: usize,
        attempts: u32,
        #[source]
        error: ActionError,
    },

    /// The saga deadline passed while the step was in flight.
    #[error("saga timed out after {timeout:?} while step '{step}' was in flight")]
    TimeoutExceeded {
        step: String,
        index: usize,
        timeout: Duration,
    },
}

impl StepFailure {
    #[must_use]
    pub fn step(&self) -> &str {
        match self {
            Self::Action { step, .. } | Self::TimeoutExceeded { step, .. } => step,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Action { index, .. } | Self::TimeoutExceeded { index, .. } => *index,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutExceeded { .. })
    }
}

/// A compensating action that did not succeed.
///
/// The reverse chain continues past it; the failure is reported in the
/// terminal outcome's compensation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("compensation failed for step '{step}' after {attempts} attempt(s)")]
pub struct CompensationFailure {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Position of the step in the saga.
    pub index: usize,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// The last error reported by the compensating action.
    #[source]
    pub error: ActionError,
}

/// Errors from the submission interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    #[error("no run with id {0}")]
    UnknownRun(RunId),

    #[error("run {0} stopped before reaching a terminal status")]
    RunAborted(RunId),
}
