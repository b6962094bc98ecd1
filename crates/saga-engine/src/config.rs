use std::time::Duration;

use crate::retry::RetryPolicy;

/// Overall deadline applied to sagas that do not set their own.
pub const DEFAULT_SAGA_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound on a single action call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine-wide settings, passed explicitly to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    store_location: Option<String>,
    default_retry: RetryPolicy,
    default_timeout: Duration,
    call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_location: None,
            default_retry: RetryPolicy::default(),
            default_timeout: DEFAULT_SAGA_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn store_location(&self) -> Option<&str> {
        self.store_location.as_deref()
    }

    #[must_use]
    pub fn default_retry(&self) -> &RetryPolicy {
        &self.default_retry
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    #[must_use]
    pub fn with_store_location(mut self, location: impl Into<String>) -> Self {
        self.store_location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_default_retry(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = policy;
        self
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}
