use std::marker::PhantomData;
use std::time::Duration;

use crate::definition::{SagaDefinition, StepDefinition};
use crate::error::DefinitionError;

/// Marker type for a builder with no steps.
pub struct Empty;

/// Marker type for a builder with at least one step.
pub struct HasSteps;

/// Type-state builder for saga definitions.
///
/// `build()` only exists once a first step has been added, so an empty saga
/// is rejected at compile time:
///
/// ```compile_fail
/// use saga_engine::SagaDefinition;
///
/// let saga = SagaDefinition::builder("empty").build();
/// ```
///
/// The remaining rules (distinct output keys, valid retry policies) are
/// checked when `build()` runs:
///
/// ```
/// use saga_engine::{SagaDefinition, StepDefinition};
///
/// let result = SagaDefinition::builder("dup")
///     .first_step(StepDefinition::new("a", "do-a", "out"))
///     .then(StepDefinition::new("b", "do-b", "out"))
///     .build();
///
/// assert!(result.is_err());
/// ```
pub struct SagaBuilder<State> {
    name: String,
    steps: Vec<StepDefinition>,
    timeout: Option<Duration>,
    _state: PhantomData<State>,
}

impl SagaBuilder<Empty> {
    /// Create a new saga builder in the empty state.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            timeout: None,
            _state: PhantomData,
        }
    }

    /// Add the first step to the saga.
    #[must_use]
    pub fn first_step(self, step: StepDefinition) -> SagaBuilder<HasSteps> {
        let mut steps = self.steps;
        steps.push(step);
        SagaBuilder {
            name: self.name,
            steps,
            timeout: self.timeout,
            _state: PhantomData,
        }
    }
}

impl<State> SagaBuilder<State> {
    /// Overall deadline for a run, measured from its first step.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl SagaBuilder<HasSteps> {
    /// Append a step; steps run in the order they are added.
    #[must_use]
    pub fn then(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    /// Validate and build the definition.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError` if output keys collide, a field is empty, a
    /// retry policy is invalid, or the timeout is zero.
    pub fn build(self) -> Result<SagaDefinition, DefinitionError> {
        SagaDefinition::new(self.name, self.steps, self.timeout)
    }
}
