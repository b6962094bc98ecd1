use saga_engine::{DefinitionError, StepFailure};
use saga_host::ManifestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("manifest error")]
    Manifest(#[from] ManifestError),

    #[error("saga definition rejected")]
    Definition(#[from] DefinitionError),

    #[error("--input is not valid JSON")]
    InvalidInput(#[source] serde_json::Error),

    #[error("failed to encode outcome as JSON")]
    Encode(#[source] serde_json::Error),

    #[error("failed to start async runtime")]
    Runtime(#[source] std::io::Error),

    #[error("saga '{saga}' failed and was compensated")]
    RunFailed {
        saga: String,
        #[source]
        cause: StepFailure,
    },
}

pub type Result<T> = std::result::Result<T, CliError>;
