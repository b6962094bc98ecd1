use std::path::PathBuf;

use saga_engine::DefinitionError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("failed to read manifest at '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest at '{path}'")]
    ParseAt {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML parse error")]
    Parse(#[from] toml::de::Error),

    #[error("'{field}' must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("invalid engine default retry")]
    InvalidDefaultRetry(#[source] DefinitionError),

    #[error("action '{name}' has an empty program")]
    EmptyProgram { name: String },

    #[error("invalid saga definition")]
    Definition(#[from] DefinitionError),
}
