//! Retry policy and backoff schedule for action invocations.
//!
//! Delays come from `backon`'s exponential builder; the invoker drives the
//! attempt loop itself so that every attempt is counted and logged.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};

use crate::error::DefinitionError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_delay: Duration,
    max_delay: Duration,
    factor: f32,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Policy allowing `max_attempts` attempts in total with default backoff.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// A single attempt, no retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    #[must_use]
    pub fn with_backoff(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_factor(mut self, factor: f32) -> Self {
        self.factor = factor;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    #[must_use]
    pub fn jitter(&self) -> bool {
        self.jitter
    }

    /// Delays to sleep between attempts; yields `max_attempts - 1` values.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let retries = usize::try_from(self.max_attempts.saturating_sub(1)).unwrap_or(usize::MAX);
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(retries);
        if self.jitter {
            builder = builder.with_jitter();
        }
        builder.build().take(retries)
    }

    /// Check that the policy allows an attempt and its backoff bounds are ordered.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::InvalidMaxAttempts` or
    /// `DefinitionError::InvalidBackoff`, naming `step`.
    pub fn validate(&self, step: &str) -> Result<(), DefinitionError> {
        if self.max_attempts == 0 {
            return Err(DefinitionError::InvalidMaxAttempts {
                step: step.to_string(),
            });
        }
        if self.min_delay > self.max_delay {
            return Err(DefinitionError::InvalidBackoff {
                step: step.to_string(),
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}
