use saga_engine::{SagaAuditLog, StepFailure, TerminalOutcome};

use super::OutcomeFormatter;
use crate::error::Result;

pub(crate) struct PlainTextFormatter;

impl PlainTextFormatter {
    fn format_results(output: &mut String, outcome: &TerminalOutcome) {
        let context = outcome.context();
        if context.is_empty() {
            return;
        }
        output.push_str("\nResults:\n");
        for key in context.keys() {
            if let Some(value) = context.get(key) {
                output.push_str(&format!("  {key}: {value}\n"));
            }
        }
    }

    fn format_cause(output: &mut String, cause: &StepFailure) {
        output.push_str(&format!("\nCause: {cause}"));
        if let StepFailure::Action { error, .. } = cause {
            output.push_str(&format!(": {error}"));
        }
        output.push('\n');
    }

    fn format_compensation_failures(output: &mut String, outcome: &TerminalOutcome) {
        let mut failures = outcome.compensation_failures().peekable();
        if failures.peek().is_none() {
            return;
        }
        output.push_str("\nCompensations that did not complete (manual cleanup needed):\n");
        for failure in failures {
            output.push_str(&format!("  {failure}: {}\n", failure.error));
        }
    }
}

impl OutcomeFormatter for PlainTextFormatter {
    fn format(
        &self,
        saga: &str,
        outcome: &TerminalOutcome,
        audit: &SagaAuditLog,
    ) -> Result<String> {
        let mut output = String::new();
        let verdict = if outcome.is_succeeded() {
            "succeeded"
        } else {
            "failed"
        };
        output.push_str(&format!(
            "Saga '{saga}' {verdict} (run {})\n",
            outcome.run_id()
        ));
        output.push_str(&audit.summary());
        output.push('\n');

        if let Some(cause) = outcome.cause() {
            Self::format_cause(&mut output, cause);
        }
        Self::format_compensation_failures(&mut output, outcome);
        Self::format_results(&mut output, outcome);
        Ok(output)
    }
}
