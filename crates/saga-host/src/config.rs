use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use saga_engine::{ActionRegistry, EngineConfig, RetryPolicy, SagaDefinition, StepDefinition};

use crate::error::ManifestError;
use crate::manifest::{RawAction, RawEngine, RawManifest, RawRetry, RawSaga, read_manifest};
use crate::process::ProcessAction;

/// A validated saga manifest: engine settings, declared actions and the saga.
#[derive(Debug, Clone)]
pub struct Manifest {
    engine: EngineConfig,
    actions: IndexMap<String, ProcessAction>,
    definition: SagaDefinition,
}

impl Manifest {
    #[must_use]
    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    #[must_use]
    pub fn definition(&self) -> &SagaDefinition {
        &self.definition
    }

    /// Declared actions, in manifest order.
    pub fn actions(&self) -> impl Iterator<Item = (&str, &ProcessAction)> {
        self.actions.iter().map(|(name, action)| (name.as_str(), action))
    }

    /// Registry with one process-backed action per `[actions.<name>]` table.
    #[must_use]
    pub fn registry(&self) -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        for (name, action) in &self.actions {
            registry.insert(name.clone(), Arc::new(action.clone()));
        }
        registry
    }

    fn from_raw(raw: RawManifest) -> Result<Self, ManifestError> {
        let engine = build_engine_config(raw.engine)?;
        let actions = build_actions(raw.actions)?;
        let definition = build_definition(raw.saga, engine.default_retry())?;
        Ok(Self {
            engine,
            actions,
            definition,
        })
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let raw: RawManifest = toml::from_str(content)?;
        Self::from_raw(raw)
    }
}

/// Reads and validates the manifest at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the saga it
/// describes is invalid.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    Manifest::from_raw(read_manifest(path)?)
}

/// Name used for the engine default policy in validation errors.
const DEFAULT_RETRY_LABEL: &str = "engine default";

fn build_engine_config(raw: RawEngine) -> Result<EngineConfig, ManifestError> {
    let mut config = EngineConfig::default();
    if let Some(location) = raw.store_location {
        config = config.with_store_location(location);
    }
    if let Some(ms) = raw.call_timeout_ms {
        config = config.with_call_timeout(positive_millis(ms, "call-timeout-ms")?);
    }
    if let Some(ms) = raw.default_timeout_ms {
        config = config.with_default_timeout(positive_millis(ms, "default-timeout-ms")?);
    }
    if let Some(retry) = raw.default_retry {
        let policy = build_retry(&retry, &RetryPolicy::default());
        policy
            .validate(DEFAULT_RETRY_LABEL)
            .map_err(ManifestError::InvalidDefaultRetry)?;
        config = config.with_default_retry(policy);
    }
    Ok(config)
}

fn build_actions(
    raw: IndexMap<String, RawAction>,
) -> Result<IndexMap<String, ProcessAction>, ManifestError> {
    raw.into_iter()
        .map(|(name, action)| {
            if action.program.trim().is_empty() {
                return Err(ManifestError::EmptyProgram { name });
            }
            let mut process = ProcessAction::new(action.program).with_args(action.args);
            for (key, value) in action.env {
                process = process.with_env(key, value);
            }
            Ok((name, process))
        })
        .collect()
}

/// Missing fields fall back to `base`.
fn build_retry(raw: &RawRetry, base: &RetryPolicy) -> RetryPolicy {
    let min_delay = raw
        .min_delay_ms
        .map_or(base.min_delay(), Duration::from_millis);
    let max_delay = raw
        .max_delay_ms
        .map_or(base.max_delay(), Duration::from_millis);
    RetryPolicy::new(raw.max_attempts.unwrap_or(base.max_attempts()))
        .with_backoff(min_delay, max_delay)
        .with_factor(raw.factor.unwrap_or(base.factor()))
        .with_jitter(raw.jitter.unwrap_or(base.jitter()))
}

fn build_definition(
    raw: RawSaga,
    default_retry: &RetryPolicy,
) -> Result<SagaDefinition, ManifestError> {
    let steps = raw
        .steps
        .into_iter()
        .map(|step| {
            let mut definition = StepDefinition::new(step.name, step.action, step.output_key)
                .with_inputs(step.inputs);
            if let Some(compensation) = step.compensation {
                definition = definition.compensated_by(compensation);
            }
            if let Some(retry) = &step.retry {
                definition = definition.with_retry(build_retry(retry, default_retry));
            }
            if let Some(retry) = &step.compensation_retry {
                definition = definition.with_compensation_retry(build_retry(retry, default_retry));
            }
            definition
        })
        .collect();
    let timeout = raw.timeout_ms.map(Duration::from_millis);
    Ok(SagaDefinition::new(raw.name, steps, timeout)?)
}

fn positive_millis(ms: u64, field: &'static str) -> Result<Duration, ManifestError> {
    if ms == 0 {
        return Err(ManifestError::ZeroDuration { field });
    }
    Ok(Duration::from_millis(ms))
}
