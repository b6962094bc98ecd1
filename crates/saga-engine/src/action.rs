use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::context::RunContext;
use crate::error::ActionError;
use crate::outcome::RunId;

/// Result of a single call to an external step handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure(ActionError),
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<Value, ActionError>> for Outcome {
    fn from(result: Result<Value, ActionError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

/// What an action sees when it is invoked.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRequest {
    /// Identity of the saga run, usable as a record key by handlers.
    pub run_id: RunId,
    /// Name of the step being executed or compensated.
    pub step: String,
    /// The slice of the run context this step is allowed to see.
    pub context: RunContext,
    /// Opaque location of the store handlers write to, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_location: Option<String>,
}

/// An invocable capability: a forward action or a compensating action.
///
/// Implementations perform exactly one call to the external system per
/// `invoke`. Retries and timeouts are applied by the invoker around it, so
/// an implementation should not retry internally. A panic inside `invoke` is
/// caught by the invoker and counts as a failed attempt with code `panic`.
#[async_trait]
pub trait Action: Send + Sync {
    async fn invoke(&self, request: &ActionRequest) -> Outcome;
}
