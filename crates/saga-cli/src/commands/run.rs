use saga_engine::{RunId, SagaExecutor};
use saga_host::load_manifest;
use serde_json::Value;
use tracing::info;

use super::RunArgs;
use crate::error::{CliError, Result};

pub(crate) fn run(args: RunArgs) -> Result<()> {
    let input = parse_input(args.input.as_deref())?;
    let manifest = load_manifest(&args.manifest)?;
    let executor = SagaExecutor::new(manifest.engine_config().clone(), manifest.registry());
    let saga = executor.prepare(manifest.definition().clone())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let run_id = RunId::new();
    info!(%run_id, saga = saga.name(), manifest = %args.manifest.display(), "running saga");
    let (outcome, audit) = runtime.block_on(executor.execute_with_audit(&saga, run_id, input));

    let report = args
        .format
        .formatter()
        .format(saga.name(), &outcome, &audit)?;
    print!("{report}");

    match outcome.cause() {
        None => Ok(()),
        Some(cause) => Err(CliError::RunFailed {
            saga: saga.name().to_string(),
            cause: cause.clone(),
        }),
    }
}

fn parse_input(raw: Option<&str>) -> Result<Value> {
    raw.map_or(Ok(Value::Null), |raw| {
        serde_json::from_str(raw).map_err(CliError::InvalidInput)
    })
}
