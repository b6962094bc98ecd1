use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ManifestError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawManifest {
    #[serde(default)]
    pub(crate) engine: RawEngine,
    #[serde(default)]
    pub(crate) actions: IndexMap<String, RawAction>,
    pub(crate) saga: RawSaga,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct RawEngine {
    pub(crate) store_location: Option<String>,
    pub(crate) call_timeout_ms: Option<u64>,
    pub(crate) default_timeout_ms: Option<u64>,
    pub(crate) default_retry: Option<RawRetry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct RawRetry {
    pub(crate) max_attempts: Option<u32>,
    pub(crate) min_delay_ms: Option<u64>,
    pub(crate) max_delay_ms: Option<u64>,
    pub(crate) factor: Option<f32>,
    pub(crate) jitter: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawAction {
    pub(crate) program: String,
    #[serde(default)]
    pub(crate) args: Vec<String>,
    #[serde(default)]
    pub(crate) env: IndexMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct RawSaga {
    pub(crate) name: String,
    pub(crate) timeout_ms: Option<u64>,
    #[serde(default)]
    pub(crate) steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct RawStep {
    pub(crate) name: String,
    pub(crate) action: String,
    pub(crate) compensation: Option<String>,
    pub(crate) output_key: String,
    #[serde(default)]
    pub(crate) inputs: Vec<String>,
    pub(crate) retry: Option<RawRetry>,
    pub(crate) compensation_retry: Option<RawRetry>,
}

pub(crate) fn read_manifest(path: &Path) -> Result<RawManifest, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ManifestError::ParseAt {
        path: path.to_path_buf(),
        source,
    })
}
