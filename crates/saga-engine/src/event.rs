//! Structured events emitted on every saga state transition.
//!
//! The full timeline of a run can be rebuilt from its events alone.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::StepFailure;
use crate::outcome::{CompensationStatus, RunId};
use crate::state::RunState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SagaEvent {
    pub run_id: RunId,
    pub saga: String,
    /// State of the run after this event.
    pub state: RunState,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventKind {
    RunStarted {
        steps: usize,
    },
    StepStarted {
        index: usize,
        step: String,
    },
    StepSucceeded {
        index: usize,
        step: String,
        attempts: u32,
    },
    StepFailed {
        index: usize,
        step: String,
        failure: StepFailure,
    },
    CompensationStarted {
        index: usize,
        step: String,
    },
    CompensationFinished {
        index: usize,
        step: String,
        status: CompensationStatus,
    },
    RunTerminal {
        succeeded: bool,
    },
}

/// Receiver of saga events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SagaEvent);
}

/// Writes every event to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SagaEvent) {
        let run_id = &event.run_id;
        let saga = event.saga.as_str();
        let state = &event.state;
        match &event.kind {
            EventKind::RunStarted { steps } => {
                info!(%run_id, saga, %state, steps, "saga run started");
            }
            EventKind::StepStarted { index, step } => {
                debug!(%run_id, saga, %state, index, %step, "step started");
            }
            EventKind::StepSucceeded {
                index,
                step,
                attempts,
            } => {
                info!(%run_id, saga, %state, index, %step, attempts, "step succeeded");
            }
            EventKind::StepFailed {
                index,
                step,
                failure,
            } => {
                warn!(%run_id, saga, %state, index, %step, %failure, "step failed");
            }
            EventKind::CompensationStarted { index, step } => {
                debug!(%run_id, saga, %state, index, %step, "compensation started");
            }
            EventKind::CompensationFinished {
                index,
                step,
                status,
            } => match status {
                CompensationStatus::Failed { failure } => {
                    warn!(
                        %run_id, saga, %state, index, %step,
                        error = %failure.error,
                        attempts = failure.attempts,
                        "compensation failed, continuing with earlier steps"
                    );
                }
                other => {
                    info!(%run_id, saga, %state, index, %step, status = ?other, "compensation finished");
                }
            },
            EventKind::RunTerminal { succeeded } => {
                info!(%run_id, saga, %state, succeeded, "saga run finished");
            }
        }
    }
}

/// In-memory event recorder; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<SagaEvent>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<SagaEvent> {
        self.lock().clone()
    }

    /// Events of a single run, in emission order.
    #[must_use]
    pub fn for_run(&self, run_id: RunId) -> Vec<SagaEvent> {
        self.lock()
            .iter()
            .filter(|event| event.run_id == run_id)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SagaEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: &SagaEvent) {
        self.lock().push(event.clone());
    }
}
