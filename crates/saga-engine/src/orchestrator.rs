use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;

use crate::definition::SagaDefinition;
use crate::error::{DefinitionError, OrchestratorError};
use crate::executor::{PreparedSaga, SagaExecutor};
use crate::outcome::{RunId, TerminalOutcome};

type OutcomeReceiver = watch::Receiver<Option<TerminalOutcome>>;

/// Accepts saga submissions and runs each one on its own task.
///
/// Runs share nothing but the executor; each owns its context. The outcome
/// of a run stays available until it is archived.
#[derive(Debug)]
pub struct Orchestrator {
    executor: Arc<SagaExecutor>,
    runs: Mutex<HashMap<RunId, OutcomeReceiver>>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(executor: SagaExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            runs: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn executor(&self) -> &SagaExecutor {
        &self.executor
    }

    /// Validate `definition` and start a run with `input`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError` if a capability cannot be resolved. Nothing
    /// is invoked in that case.
    pub fn submit(
        &self,
        definition: SagaDefinition,
        input: Value,
    ) -> Result<RunId, DefinitionError> {
        let prepared = self.executor.prepare(definition)?;
        Ok(self.submit_prepared(Arc::new(prepared), input))
    }

    /// Start a run of an already prepared saga.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit_prepared(&self, saga: Arc<PreparedSaga>, input: Value) -> RunId {
        let run_id = RunId::new();
        let (sender, receiver) = watch::channel(None);
        self.lock().insert(run_id, receiver);

        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            let outcome = executor.execute(&saga, run_id, input).await;
            sender.send_replace(Some(outcome));
        });

        run_id
    }

    /// Wait for the run to reach its terminal status.
    ///
    /// Repeated calls return the same outcome.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::UnknownRun` for ids that were never
    /// submitted or were archived, and `OrchestratorError::RunAborted` if the
    /// task driving the run died.
    pub async fn await_outcome(&self, run_id: RunId) -> Result<TerminalOutcome, OrchestratorError> {
        let mut receiver = self.receiver(run_id)?;
        let outcome = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| OrchestratorError::RunAborted(run_id))?;
        outcome
            .as_ref()
            .cloned()
            .ok_or(OrchestratorError::RunAborted(run_id))
    }

    /// The run's outcome if it has finished, without waiting.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::UnknownRun` for unknown ids.
    pub fn try_outcome(&self, run_id: RunId) -> Result<Option<TerminalOutcome>, OrchestratorError> {
        Ok(self.receiver(run_id)?.borrow().clone())
    }

    /// Drop a finished run and hand back its outcome.
    ///
    /// Returns `Ok(None)` and keeps the run if it is still in progress.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::UnknownRun` for unknown ids.
    pub fn archive(&self, run_id: RunId) -> Result<Option<TerminalOutcome>, OrchestratorError> {
        let mut runs = self.lock();
        let outcome = runs
            .get(&run_id)
            .ok_or(OrchestratorError::UnknownRun(run_id))?
            .borrow()
            .clone();
        if outcome.is_some() {
            runs.remove(&run_id);
        }
        Ok(outcome)
    }

    /// Number of runs that have not been archived.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn receiver(&self, run_id: RunId) -> Result<OutcomeReceiver, OrchestratorError> {
        self.lock()
            .get(&run_id)
            .cloned()
            .ok_or(OrchestratorError::UnknownRun(run_id))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RunId, OutcomeReceiver>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
