use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::action::{Action, ActionRequest, Outcome};
use crate::error::ActionError;
use crate::retry::RetryPolicy;

/// Outcome of an invocation plus the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub outcome: Outcome,
    pub attempts: u32,
}

/// Calls actions with a per-call timeout and retries failures per policy.
///
/// Every attempt reaches the external system; nothing here assumes the
/// action is idempotent.
#[derive(Debug, Clone, Copy)]
pub struct ActionInvoker {
    call_timeout: Duration,
}

impl ActionInvoker {
    #[must_use]
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Invoke `action` until it succeeds or `policy.max_attempts()` attempts
    /// have failed. Always resolves.
    pub async fn invoke(
        &self,
        action: &dyn Action,
        request: &ActionRequest,
        policy: &RetryPolicy,
    ) -> Invocation {
        let mut delays = policy.delays();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let outcome = self.attempt(action, request).await;

            let Outcome::Failure(error) = &outcome else {
                debug!(
                    run_id = %request.run_id,
                    step = %request.step,
                    attempt = attempts,
                    "action succeeded"
                );
                return Invocation { outcome, attempts };
            };

            match delays.next() {
                Some(delay) => {
                    warn!(
                        run_id = %request.run_id,
                        step = %request.step,
                        attempt = attempts,
                        max_attempts = policy.max_attempts(),
                        error = %error,
                        ?delay,
                        "action attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(
                        run_id = %request.run_id,
                        step = %request.step,
                        attempts,
                        error = %error,
                        "action failed, no attempts left"
                    );
                    return Invocation { outcome, attempts };
                }
            }
        }
    }

    async fn attempt(&self, action: &dyn Action, request: &ActionRequest) -> Outcome {
        let call = AssertUnwindSafe(action.invoke(request)).catch_unwind();
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(payload)) => Outcome::Failure(ActionError::panicked(panic_message(&*payload))),
            Err(_elapsed) => Outcome::Failure(ActionError::timed_out(self.call_timeout)),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::context::RunContext;
    use crate::outcome::RunId;

    /// Fails the first `failures` calls, then succeeds with the call count.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Action for Flaky {
        async fn invoke(&self, _request: &ActionRequest) -> Outcome {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Outcome::Failure(ActionError::new(format!("failure #{call}")))
            } else {
                Outcome::Success(json!(call))
            }
        }
    }

    struct Hangs {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Action for Hangs {
        async fn invoke(&self, _request: &ActionRequest) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Outcome::Success(Value::Null)
        }
    }

    struct Panics;

    #[async_trait]
    impl Action for Panics {
        async fn invoke(&self, _request: &ActionRequest) -> Outcome {
            panic!("handler bug")
        }
    }

    fn request() -> ActionRequest {
        ActionRequest {
            run_id: RunId::new(),
            step: "reserve_hotel".to_string(),
            context: RunContext::default(),
            store_location: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_action_is_attempted_exactly_max_attempts_times() {
        let action = Flaky::new(u32::MAX);
        let invoker = ActionInvoker::new(Duration::from_secs(1));

        let invocation = invoker
            .invoke(&action, &request(), &RetryPolicy::new(3))
            .await;

        assert_eq!(invocation.attempts, 3);
        assert_eq!(action.calls(), 3);
        assert_eq!(
            invocation.outcome,
            Outcome::Failure(ActionError::new("failure #3"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_retries_reports_attempt_count() {
        let action = Flaky::new(2);
        let invoker = ActionInvoker::new(Duration::from_secs(1));

        let invocation = invoker
            .invoke(&action, &request(), &RetryPolicy::new(5))
            .await;

        assert_eq!(invocation.attempts, 3);
        assert_eq!(invocation.outcome, Outcome::Success(json!(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_does_not_retry() {
        let action = Flaky::new(1);
        let invoker = ActionInvoker::new(Duration::from_secs(1));

        let invocation = invoker
            .invoke(&action, &request(), &RetryPolicy::no_retry())
            .await;

        assert_eq!(invocation.attempts, 1);
        assert!(!invocation.outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_fails_with_timeout_code() {
        let action = Hangs {
            calls: AtomicU32::new(0),
        };
        let invoker = ActionInvoker::new(Duration::from_millis(250));

        let invocation = invoker
            .invoke(&action, &request(), &RetryPolicy::new(2))
            .await;

        assert_eq!(invocation.attempts, 2);
        assert_eq!(action.calls.load(Ordering::SeqCst), 2);
        match invocation.outcome {
            Outcome::Failure(error) => assert!(error.is_timeout()),
            Outcome::Success(_) => panic!("expected timeout failure"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_action_fails_each_attempt_with_panic_code() {
        let invoker = ActionInvoker::new(Duration::from_secs(1));

        let invocation = invoker
            .invoke(&Panics, &request(), &RetryPolicy::new(2))
            .await;

        assert_eq!(invocation.attempts, 2);
        assert_eq!(
            invocation.outcome,
            Outcome::Failure(ActionError::panicked("handler bug"))
        );
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("formatted 7"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(&*owned), "formatted 7");
        assert_eq!(panic_message(&*other), "non-string panic payload");
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_elapse_between_attempts() {
        let action = Flaky::new(u32::MAX);
        let invoker = ActionInvoker::new(Duration::from_secs(1));
        let policy = RetryPolicy::new(3)
            .with_backoff(Duration::from_millis(100), Duration::from_secs(1))
            .with_factor(2.0);
        let start = tokio::time::Instant::now();

        invoker.invoke(&action, &request(), &policy).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "elapsed {elapsed:?}");
    }
}
