//! Hosting for saga-engine: TOML manifests and process-backed actions.
//!
//! A manifest declares engine settings, a set of named actions (each a local
//! program), and one saga whose steps refer to those actions by name.

mod config;
mod error;
mod manifest;
mod process;

pub use config::{Manifest, load_manifest};
pub use error::ManifestError;
pub use process::{ProcessAction, RUN_ID_VAR, SPAWN_CODE, STEP_VAR, STORE_LOCATION_VAR};
