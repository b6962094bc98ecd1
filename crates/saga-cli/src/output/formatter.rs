use saga_engine::{SagaAuditLog, TerminalOutcome};

use crate::error::Result;

pub(crate) trait OutcomeFormatter {
    fn format(
        &self,
        saga: &str,
        outcome: &TerminalOutcome,
        audit: &SagaAuditLog,
    ) -> Result<String>;
}
