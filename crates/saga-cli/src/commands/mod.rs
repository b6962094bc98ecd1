mod run;
mod validate;

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::error::Result;
use crate::output::OutputFormat;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check that a manifest parses and every step resolves to a declared action
    Validate(ValidateArgs),
    /// Run the manifest's saga once and report its outcome
    Run(RunArgs),
}

#[derive(Args)]
pub(crate) struct ValidateArgs {
    /// Path to the saga manifest
    pub manifest: PathBuf,
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// Path to the saga manifest
    pub manifest: PathBuf,

    /// Initial run input as JSON (default: null)
    #[arg(long, short)]
    pub input: Option<String>,

    /// Output format for the terminal outcome
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl Commands {
    pub(crate) fn execute(self) -> Result<()> {
        match self {
            Self::Validate(args) => validate::run(args),
            Self::Run(args) => run::run(args),
        }
    }
}
