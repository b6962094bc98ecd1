mod common;

use common::{Behavior, Journal, Scripted, executor};
use saga_engine::{
    ActionRegistry, CompensationStatus, RetryPolicy, RunId, SagaDefinition, StepDefinition,
    StepFailure,
};
use serde_json::json;

fn three_step_saga(compensation_retry: RetryPolicy) -> anyhow::Result<SagaDefinition> {
    Ok(SagaDefinition::builder("payments")
        .first_step(
            StepDefinition::new("hotel", "reserve_hotel", "hotel").compensated_by("cancel_hotel"),
        )
        .then(
            StepDefinition::new("flight", "reserve_flight", "flight")
                .compensated_by("cancel_flight")
                .with_compensation_retry(compensation_retry),
        )
        .then(StepDefinition::new("payment", "take_payment", "payment").compensated_by("refund"))
        .build()?)
}

fn registry(journal: &Journal, cancel_flight: Scripted) -> ActionRegistry {
    ActionRegistry::new()
        .with("reserve_hotel", Scripted::succeeding("reserve_hotel", journal))
        .with("cancel_hotel", Scripted::succeeding("cancel_hotel", journal))
        .with("reserve_flight", Scripted::succeeding("reserve_flight", journal))
        .with("cancel_flight", cancel_flight)
        .with("take_payment", Scripted::failing("take_payment", journal))
        .with("refund", Scripted::succeeding("refund", journal))
}

#[tokio::test(start_paused = true)]
async fn failed_compensation_does_not_stop_earlier_compensations() -> anyhow::Result<()> {
    let journal = Journal::default();
    let registry = registry(&journal, Scripted::failing("cancel_flight", &journal));
    let (executor, _events) = executor(registry);
    let saga = executor.prepare(three_step_saga(RetryPolicy::no_retry())?)?;

    let outcome = executor.execute(&saga, RunId::new(), json!(null)).await;

    assert_eq!(
        journal.calls(),
        [
            "reserve_hotel",
            "reserve_flight",
            "take_payment",
            "cancel_flight",
            "cancel_hotel"
        ]
    );
    assert!(matches!(
        outcome.cause(),
        Some(StepFailure::Action { index: 2, .. })
    ));

    let failures: Vec<_> = outcome.compensation_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].step, "flight");
    assert_eq!(failures[0].index, 1);
    assert_eq!(failures[0].attempts, 1);
    assert_eq!(failures[0].error.message, "cancel_flight failed");

    let hotel = &outcome.compensation_log()[1];
    assert_eq!(hotel.index, 0);
    assert_eq!(hotel.status, CompensationStatus::Compensated { attempts: 1 });
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn compensation_is_retried_up_to_its_policy() -> anyhow::Result<()> {
    let journal = Journal::default();
    let registry = registry(&journal, Scripted::failing("cancel_flight", &journal));
    let (executor, _events) = executor(registry);
    let saga = executor.prepare(three_step_saga(RetryPolicy::new(3))?)?;

    let outcome = executor.execute(&saga, RunId::new(), json!(null)).await;

    assert_eq!(journal.count("cancel_flight"), 3);
    assert_eq!(journal.count("cancel_hotel"), 1);
    let failures: Vec<_> = outcome.compensation_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].attempts, 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn compensation_that_recovers_within_retries_is_compensated() -> anyhow::Result<()> {
    let journal = Journal::default();
    let flaky = Scripted::succeeding("cancel_flight", &journal)
        .first(Behavior::Fail("gateway busy".to_string()));
    let (executor, _events) = executor(registry(&journal, flaky));
    let saga = executor.prepare(three_step_saga(RetryPolicy::new(3))?)?;

    let outcome = executor.execute(&saga, RunId::new(), json!(null)).await;

    assert_eq!(outcome.compensation_failures().count(), 0);
    assert_eq!(
        outcome.compensation_log()[0].status,
        CompensationStatus::Compensated { attempts: 2 }
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn hanging_compensation_times_out_per_call_and_unwind_continues() -> anyhow::Result<()> {
    let journal = Journal::default();
    let registry = registry(&journal, Scripted::hanging("cancel_flight", &journal));
    let (executor, _events) = executor(registry);
    let saga = executor.prepare(three_step_saga(RetryPolicy::no_retry())?)?;

    let outcome = executor.execute(&saga, RunId::new(), json!(null)).await;

    let failures: Vec<_> = outcome.compensation_failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.is_timeout());
    assert_eq!(journal.calls().last().map(String::as_str), Some("cancel_hotel"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_run_keeps_results_of_compensated_steps() -> anyhow::Result<()> {
    let journal = Journal::default();
    let registry = registry(&journal, Scripted::succeeding("cancel_flight", &journal));
    let (executor, _events) = executor(registry);
    let saga = executor.prepare(three_step_saga(RetryPolicy::no_retry())?)?;

    let outcome = executor.execute(&saga, RunId::new(), json!(null)).await;

    let keys: Vec<_> = outcome.context().keys().collect();
    assert_eq!(keys, ["hotel", "flight"]);
    Ok(())
}
