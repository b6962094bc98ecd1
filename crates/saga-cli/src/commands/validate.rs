use saga_engine::SagaExecutor;
use saga_host::load_manifest;

use super::ValidateArgs;
use crate::error::Result;

pub(crate) fn run(args: ValidateArgs) -> Result<()> {
    let manifest = load_manifest(&args.manifest)?;
    let executor = SagaExecutor::new(manifest.engine_config().clone(), manifest.registry());
    let saga = executor.prepare(manifest.definition().clone())?;

    println!(
        "Saga '{}' is valid: {} step(s), timeout {:?}",
        saga.name(),
        saga.definition().len(),
        saga.timeout()
    );
    for (index, step) in saga.definition().steps().iter().enumerate() {
        println!(
            "  {index}. {} -> {} ({})",
            step.name(),
            step.output_key(),
            step.compensation_description()
        );
    }
    Ok(())
}
