mod formatter;
mod json;
mod plain;

use clap::ValueEnum;

pub(crate) use formatter::OutcomeFormatter;
pub(crate) use json::JsonFormatter;
pub(crate) use plain::PlainTextFormatter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Audit summary followed by the run's results
    #[default]
    Plain,
    /// The terminal outcome as JSON
    Json,
}

impl OutputFormat {
    pub(crate) fn formatter(self) -> Box<dyn OutcomeFormatter> {
        match self {
            Self::Plain => Box::new(PlainTextFormatter),
            Self::Json => Box::new(JsonFormatter),
        }
    }
}
