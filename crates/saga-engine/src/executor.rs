use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::action::{Action, ActionRequest, Outcome};
use crate::audit::SagaAuditLog;
use crate::config::EngineConfig;
use crate::context::RunContext;
use crate::definition::{SagaDefinition, StepDefinition};
use crate::error::{ActionError, CompensationFailure, DefinitionError, StepFailure};
use crate::event::{EventKind, EventSink, SagaEvent, TracingSink};
use crate::invoker::{ActionInvoker, Invocation};
use crate::outcome::{CompensationRecord, CompensationStatus, RunId, TerminalOutcome};
use crate::registry::ActionRegistry;
use crate::retry::RetryPolicy;
use crate::state::RunState;

/// A saga definition with every capability resolved and every default applied.
///
/// Produced by [`SagaExecutor::prepare`]; cheap to share between runs.
#[derive(Clone)]
pub struct PreparedSaga {
    definition: SagaDefinition,
    steps: Vec<PreparedStep>,
    timeout: Duration,
}

#[derive(Clone)]
struct PreparedStep {
    forward: Arc<dyn Action>,
    compensation: Option<Arc<dyn Action>>,
    retry: RetryPolicy,
    compensation_retry: RetryPolicy,
    compensation_inputs: Vec<String>,
}

impl PreparedSaga {
    #[must_use]
    pub fn definition(&self) -> &SagaDefinition {
        &self.definition
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Effective overall deadline for runs of this saga.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn step(&self, index: usize) -> (&StepDefinition, &PreparedStep) {
        (&self.definition.steps()[index], &self.steps[index])
    }
}

impl fmt::Debug for PreparedSaga {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedSaga")
            .field("definition", &self.definition)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Drives saga runs forward and, on failure, backward through compensations.
///
/// A run advances strictly one action at a time. The only suspension point is
/// the pending action invocation.
pub struct SagaExecutor {
    config: EngineConfig,
    registry: ActionRegistry,
    invoker: ActionInvoker,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl SagaExecutor {
    /// Create an executor that reports events through `tracing`.
    #[must_use]
    pub fn new(config: EngineConfig, registry: ActionRegistry) -> Self {
        let invoker = ActionInvoker::new(config.call_timeout());
        Self {
            config,
            registry,
            invoker,
            sinks: vec![Arc::new(TracingSink)],
        }
    }

    /// Send events to `sink` as well.
    #[must_use]
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Resolve capabilities and apply configured defaults.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::UnknownCapability` if a step names an action
    /// that is not registered. Policies and the timeout inherited from the
    /// engine config are checked like explicit ones, so an invalid default
    /// fails here with `InvalidMaxAttempts`, `InvalidBackoff` or `ZeroTimeout`.
    pub fn prepare(&self, definition: SagaDefinition) -> Result<PreparedSaga, DefinitionError> {
        let resolve = |step: &StepDefinition, capability: &str| {
            self.registry
                .get(capability)
                .ok_or_else(|| DefinitionError::UnknownCapability {
                    step: step.name().to_string(),
                    capability: capability.to_string(),
                })
        };

        let steps = definition
            .steps()
            .iter()
            .map(|step| {
                let forward = resolve(step, step.action())?;
                let compensation = step
                    .compensation()
                    .map(|capability| resolve(step, capability))
                    .transpose()?;
                let retry = step
                    .retry()
                    .unwrap_or_else(|| self.config.default_retry())
                    .clone();
                let compensation_retry = step.compensation_retry().unwrap_or(&retry).clone();
                retry.validate(step.name())?;
                compensation_retry.validate(step.name())?;
                let mut compensation_inputs = step.inputs().to_vec();
                if !compensation_inputs.is_empty() {
                    compensation_inputs.push(step.output_key().to_string());
                }
                Ok(PreparedStep {
                    forward,
                    compensation,
                    retry,
                    compensation_retry,
                    compensation_inputs,
                })
            })
            .collect::<Result<Vec<_>, DefinitionError>>()?;

        let timeout = definition
            .timeout()
            .unwrap_or_else(|| self.config.default_timeout());
        if timeout.is_zero() {
            return Err(DefinitionError::ZeroTimeout {
                saga: definition.name().to_string(),
            });
        }

        Ok(PreparedSaga {
            definition,
            steps,
            timeout,
        })
    }

    /// Run the saga to a terminal outcome.
    ///
    /// Never fails: action failures, timeouts and compensation failures are
    /// all reported through the returned outcome.
    pub async fn execute(&self, saga: &PreparedSaga, run_id: RunId, input: Value) -> TerminalOutcome {
        let (outcome, _audit_log) = self.execute_internal(saga, run_id, input).await;
        outcome
    }

    /// Run the saga and return both the outcome and a per-step audit log.
    pub async fn execute_with_audit(
        &self,
        saga: &PreparedSaga,
        run_id: RunId,
        input: Value,
    ) -> (TerminalOutcome, SagaAuditLog) {
        self.execute_internal(saga, run_id, input).await
    }

    async fn execute_internal(
        &self,
        saga: &PreparedSaga,
        run_id: RunId,
        input: Value,
    ) -> (TerminalOutcome, SagaAuditLog) {
        let mut run = SagaRun::new(run_id, input);
        let mut deadline = Instant::now() + saga.timeout;

        loop {
            match run.state {
                RunState::NotStarted => {
                    deadline = Instant::now() + saga.timeout;
                    run.state = RunState::RunningForward(0);
                    self.emit(
                        saga,
                        &run,
                        EventKind::RunStarted {
                            steps: saga.steps.len(),
                        },
                    );
                }
                RunState::RunningForward(index) => {
                    self.run_forward(saga, &mut run, index, deadline).await;
                }
                RunState::Compensating(index) => {
                    self.compensate(saga, &mut run, index).await;
                }
                RunState::Succeeded | RunState::Failed => break,
            }
        }

        let succeeded = run.state == RunState::Succeeded;
        self.emit(saga, &run, EventKind::RunTerminal { succeeded });
        run.finish()
    }

    async fn run_forward(
        &self,
        saga: &PreparedSaga,
        run: &mut SagaRun,
        index: usize,
        deadline: Instant,
    ) {
        let (definition, step) = saga.step(index);
        let name = definition.name();

        run.audit.record_start(index, name);
        self.emit(
            saga,
            run,
            EventKind::StepStarted {
                index,
                step: name.to_string(),
            },
        );

        let request = self.request(run, name, definition.inputs());
        let invocation = tokio::time::timeout_at(
            deadline,
            self.invoker
                .invoke(step.forward.as_ref(), &request, &step.retry),
        )
        .await;

        let (failure, attempts) = match invocation {
            Ok(Invocation {
                outcome: Outcome::Success(payload),
                attempts,
            }) => match run.context.set(definition.output_key(), payload) {
                Ok(()) => {
                    run.audit
                        .record_success(attempts, definition.compensation_description());
                    run.state = RunState::after_success(index, saga.steps.len());
                    self.emit(
                        saga,
                        run,
                        EventKind::StepSucceeded {
                            index,
                            step: name.to_string(),
                            attempts,
                        },
                    );
                    return;
                }
                Err(duplicate) => (
                    StepFailure::Action {
                        step: name.to_string(),
                        index,
                        attempts,
                        error: ActionError::new(duplicate.to_string()).with_code("duplicate-key"),
                    },
                    attempts,
                ),
            },
            Ok(Invocation {
                outcome: Outcome::Failure(error),
                attempts,
            }) => (
                StepFailure::Action {
                    step: name.to_string(),
                    index,
                    attempts,
                    error,
                },
                attempts,
            ),
            Err(_elapsed) => (
                StepFailure::TimeoutExceeded {
                    step: name.to_string(),
                    index,
                    timeout: saga.timeout,
                },
                0,
            ),
        };

        run.audit.record_failure(attempts);
        run.state = RunState::after_failure(index);
        self.emit(
            saga,
            run,
            EventKind::StepFailed {
                index,
                step: name.to_string(),
                failure: failure.clone(),
            },
        );
        run.cause = Some(failure);
    }

    async fn compensate(&self, saga: &PreparedSaga, run: &mut SagaRun, index: usize) {
        let (definition, step) = saga.step(index);
        let name = definition.name();

        let status = match &step.compensation {
            None => {
                run.audit.record_compensation_skipped(index);
                CompensationStatus::Skipped
            }
            Some(action) => {
                self.emit(
                    saga,
                    run,
                    EventKind::CompensationStarted {
                        index,
                        step: name.to_string(),
                    },
                );
                let request = self.request(run, name, &step.compensation_inputs);
                let invocation = self
                    .invoker
                    .invoke(action.as_ref(), &request, &step.compensation_retry)
                    .await;
                match invocation.outcome {
                    Outcome::Success(_) => {
                        run.audit.record_compensated(index);
                        CompensationStatus::Compensated {
                            attempts: invocation.attempts,
                        }
                    }
                    Outcome::Failure(error) => {
                        run.audit.record_compensation_failed(index);
                        CompensationStatus::Failed {
                            failure: CompensationFailure {
                                step: name.to_string(),
                                index,
                                attempts: invocation.attempts,
                                error,
                            },
                        }
                    }
                }
            }
        };

        run.state = RunState::after_compensation(index);
        self.emit(
            saga,
            run,
            EventKind::CompensationFinished {
                index,
                step: name.to_string(),
                status: status.clone(),
            },
        );
        run.compensation_log.push(CompensationRecord {
            index,
            step: name.to_string(),
            status,
        });
    }

    fn request(&self, run: &SagaRun, step: &str, inputs: &[String]) -> ActionRequest {
        ActionRequest {
            run_id: run.id,
            step: step.to_string(),
            context: run.context.project(inputs),
            store_location: self.config.store_location().map(str::to_string),
        }
    }

    fn emit(&self, saga: &PreparedSaga, run: &SagaRun, kind: EventKind) {
        let event = SagaEvent {
            run_id: run.id,
            saga: saga.name().to_string(),
            state: run.state,
            kind,
        };
        for sink in &self.sinks {
            sink.emit(&event);
        }
    }
}

impl fmt::Debug for SagaExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaExecutor")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Mutable state of one run, owned by the task driving it.
struct SagaRun {
    id: RunId,
    state: RunState,
    context: RunContext,
    cause: Option<StepFailure>,
    compensation_log: Vec<CompensationRecord>,
    audit: SagaAuditLog,
}

impl SagaRun {
    fn new(id: RunId, input: Value) -> Self {
        Self {
            id,
            state: RunState::NotStarted,
            context: RunContext::new(input),
            cause: None,
            compensation_log: Vec::new(),
            audit: SagaAuditLog::new(),
        }
    }

    /// A recorded cause is what makes a run failed; without one every step
    /// committed.
    fn finish(self) -> (TerminalOutcome, SagaAuditLog) {
        let outcome = match self.cause {
            None => TerminalOutcome::Succeeded {
                run_id: self.id,
                context: self.context,
            },
            Some(cause) => TerminalOutcome::Failed {
                run_id: self.id,
                cause,
                compensation_log: self.compensation_log,
                context: self.context,
            },
        };
        (outcome, self.audit)
    }
}
