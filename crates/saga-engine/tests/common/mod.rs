//! Scripted actions for driving the engine through failure scenarios.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use saga_engine::{
    Action, ActionError, ActionRegistry, ActionRequest, EngineConfig, EventLog, Outcome,
    SagaDefinition, SagaExecutor, StepDefinition,
};
use serde_json::{Value, json};

/// Shared record of every action call, in call order.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: String) {
        self.calls.lock().expect("journal lock").push(entry);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("journal lock").clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.calls().iter().filter(|call| *call == entry).count()
    }
}

#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed(Value),
    Fail(String),
    Hang,
    Panic,
}

/// Action that plays back a script of behaviors, then repeats the last one.
pub struct Scripted {
    label: String,
    journal: Journal,
    script: Mutex<VecDeque<Behavior>>,
    fallback: Behavior,
}

impl Scripted {
    pub fn new(label: impl Into<String>, journal: &Journal, fallback: Behavior) -> Self {
        Self {
            label: label.into(),
            journal: journal.clone(),
            script: Mutex::new(VecDeque::new()),
            fallback,
        }
    }

    pub fn succeeding(label: impl Into<String>, journal: &Journal) -> Self {
        let label = label.into();
        let payload = json!({ "by": label });
        Self::new(label, journal, Behavior::Succeed(payload))
    }

    pub fn failing(label: impl Into<String>, journal: &Journal) -> Self {
        let label = label.into();
        let message = format!("{label} failed");
        Self::new(label, journal, Behavior::Fail(message))
    }

    pub fn hanging(label: impl Into<String>, journal: &Journal) -> Self {
        Self::new(label, journal, Behavior::Hang)
    }

    pub fn panicking(label: impl Into<String>, journal: &Journal) -> Self {
        Self::new(label, journal, Behavior::Panic)
    }

    /// Play `behavior` once before the fallback.
    pub fn first(self, behavior: Behavior) -> Self {
        self.script.lock().expect("script lock").push_back(behavior);
        self
    }
}

#[async_trait]
impl Action for Scripted {
    async fn invoke(&self, request: &ActionRequest) -> Outcome {
        self.journal.record(self.label.clone());
        let next = self.script.lock().expect("script lock").pop_front();
        match next.unwrap_or_else(|| self.fallback.clone()) {
            Behavior::Succeed(value) => Outcome::Success(value),
            Behavior::Fail(message) => {
                Outcome::Failure(ActionError::new(message).with_code(request.step.clone()))
            }
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Outcome::Success(Value::Null)
            }
            Behavior::Panic => panic!("{} panicked", self.label),
        }
    }
}

/// Linear saga `step0..stepN` where step `i` runs `do{i}` and is undone by `undo{i}`.
pub fn linear_saga(steps: usize) -> SagaDefinition {
    let definitions = (0..steps)
        .map(|i| {
            StepDefinition::new(format!("step{i}"), format!("do{i}"), format!("result{i}"))
                .compensated_by(format!("undo{i}"))
        })
        .collect();
    SagaDefinition::new("linear", definitions, None).expect("valid linear saga")
}

/// Registry for `linear_saga(steps)` where forward step `fail_at` always fails.
pub fn linear_registry(steps: usize, fail_at: Option<usize>, journal: &Journal) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    for i in 0..steps {
        let forward = if Some(i) == fail_at {
            Scripted::failing(format!("do{i}"), journal)
        } else {
            Scripted::succeeding(format!("do{i}"), journal)
        };
        registry.insert(format!("do{i}"), Arc::new(forward));
        registry.insert(
            format!("undo{i}"),
            Arc::new(Scripted::succeeding(format!("undo{i}"), journal)),
        );
    }
    registry
}

pub fn executor(registry: ActionRegistry) -> (SagaExecutor, EventLog) {
    let events = EventLog::new();
    let executor = SagaExecutor::new(EngineConfig::default(), registry).with_sink(events.clone());
    (executor, events)
}
