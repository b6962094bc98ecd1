//! Saga orchestration for remote, non-transactional steps.
//!
//! A saga is a fixed sequence of steps, each backed by an external action.
//! Steps run one at a time and write their results into a write-once run
//! context. If a step fails, or the saga's deadline passes, every step that
//! already completed is compensated in reverse order. Every run ends either
//! fully committed or fully compensated, and the outcome reports any
//! compensation that could not be carried out.

mod action;
mod audit;
mod builder;
mod config;
mod context;
mod definition;
mod error;
mod event;
mod executor;
mod invoker;
mod orchestrator;
mod outcome;
mod registry;
mod retry;
mod state;

pub use action::{Action, ActionRequest, Outcome};
pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use builder::{Empty, HasSteps, SagaBuilder};
pub use config::{DEFAULT_CALL_TIMEOUT, DEFAULT_SAGA_TIMEOUT, EngineConfig};
pub use context::RunContext;
pub use definition::{SagaDefinition, StepDefinition};
pub use error::{
    ActionError, CompensationFailure, DefinitionError, DuplicateKeyError, OrchestratorError,
    StepFailure,
};
pub use event::{EventKind, EventLog, EventSink, SagaEvent, TracingSink};
pub use executor::{PreparedSaga, SagaExecutor};
pub use invoker::{ActionInvoker, Invocation};
pub use orchestrator::Orchestrator;
pub use outcome::{CompensationRecord, CompensationStatus, RunId, TerminalOutcome};
pub use registry::ActionRegistry;
pub use retry::RetryPolicy;
pub use state::RunState;
