use saga_engine::{SagaAuditLog, TerminalOutcome};

use super::OutcomeFormatter;
use crate::error::{CliError, Result};

pub(crate) struct JsonFormatter;

impl OutcomeFormatter for JsonFormatter {
    fn format(
        &self,
        _saga: &str,
        outcome: &TerminalOutcome,
        _audit: &SagaAuditLog,
    ) -> Result<String> {
        let mut output = serde_json::to_string_pretty(outcome).map_err(CliError::Encode)?;
        output.push('\n');
        Ok(output)
    }
}
