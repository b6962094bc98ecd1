use std::collections::HashMap;
use std::time::Duration;

use crate::builder::{Empty, SagaBuilder};
use crate::error::DefinitionError;
use crate::retry::RetryPolicy;

/// Static descriptor of one saga step.
///
/// Actions are referred to by capability name and resolved against an
/// [`ActionRegistry`](crate::ActionRegistry) when the saga is prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    name: String,
    action: String,
    compensation: Option<String>,
    retry: Option<RetryPolicy>,
    compensation_retry: Option<RetryPolicy>,
    output_key: String,
    inputs: Vec<String>,
}

impl StepDefinition {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        action: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            action: action.into(),
            compensation: None,
            retry: None,
            compensation_retry: None,
            output_key: output_key.into(),
            inputs: Vec::new(),
        }
    }

    /// Register the capability that undoes this step.
    #[must_use]
    pub fn compensated_by(mut self, capability: impl Into<String>) -> Self {
        self.compensation = Some(capability.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    #[must_use]
    pub fn with_compensation_retry(mut self, policy: RetryPolicy) -> Self {
        self.compensation_retry = Some(policy);
        self
    }

    /// Restrict the context this step sees to the given result keys.
    #[must_use]
    pub fn with_inputs<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn compensation(&self) -> Option<&str> {
        self.compensation.as_deref()
    }

    #[must_use]
    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    #[must_use]
    pub fn compensation_retry(&self) -> Option<&RetryPolicy> {
        self.compensation_retry.as_ref()
    }

    #[must_use]
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Human-readable description of what compensation will do.
    #[must_use]
    pub fn compensation_description(&self) -> String {
        match &self.compensation {
            Some(capability) => format!("undo {} via {capability}", self.name),
            None => format!("nothing to undo for {}", self.name),
        }
    }

    fn validate(&self, index: usize) -> Result<(), DefinitionError> {
        let empty = |field: &'static str| DefinitionError::EmptyField { index, field };
        if self.name.is_empty() {
            return Err(empty("name"));
        }
        if self.action.is_empty() {
            return Err(empty("action"));
        }
        if self.compensation.as_deref() == Some("") {
            return Err(empty("compensation"));
        }
        if self.output_key.is_empty() {
            return Err(empty("output key"));
        }
        if let Some(policy) = &self.retry {
            policy.validate(&self.name)?;
        }
        if let Some(policy) = &self.compensation_retry {
            policy.validate(&self.name)?;
        }
        Ok(())
    }
}

/// An ordered, validated sequence of steps plus an overall timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct SagaDefinition {
    name: String,
    steps: Vec<StepDefinition>,
    timeout: Option<Duration>,
}

impl SagaDefinition {
    /// Build a definition from a runtime list of steps.
    ///
    /// Without a timeout the engine's configured default applies.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError` if the list is empty, two steps share an
    /// output key, a field is empty, a retry policy is invalid, or the
    /// timeout is zero.
    pub fn new(
        name: impl Into<String>,
        steps: Vec<StepDefinition>,
        timeout: Option<Duration>,
    ) -> Result<Self, DefinitionError> {
        let definition = Self {
            name: name.into(),
            steps,
            timeout,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Start a type-state builder; a saga without steps cannot be built.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SagaBuilder<Empty> {
        SagaBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.steps.is_empty() {
            return Err(DefinitionError::NoSteps {
                saga: self.name.clone(),
            });
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(DefinitionError::ZeroTimeout {
                saga: self.name.clone(),
            });
        }

        let mut owners: HashMap<&str, &str> = HashMap::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            step.validate(index)?;
            if let Some(first) = owners.insert(step.output_key(), step.name()) {
                return Err(DefinitionError::DuplicateOutputKey {
                    key: step.output_key().to_string(),
                    first: first.to_string(),
                    second: step.name().to_string(),
                });
            }
        }
        Ok(())
    }
}
