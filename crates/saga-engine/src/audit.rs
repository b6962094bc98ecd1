use std::time::Instant;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step is running or executed successfully.
    Executed,
    /// Step failed during execution.
    Failed,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
    /// Step had no compensating action to run.
    CompensationSkipped,
}

/// Record of a step's execution in the saga.
#[derive(Debug)]
pub struct StepRecord {
    /// Position of the step in the saga.
    pub index: usize,
    /// Name of the step.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// Attempts made by the forward action.
    pub attempts: u32,
    /// When the step started executing.
    pub started_at: Instant,
    /// When the step completed (execution or compensation).
    pub completed_at: Option<Instant>,
    /// Description of compensation (if applicable).
    pub compensation_description: Option<String>,
}

/// Audit log tracking all step executions in a saga run.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step execution starting.
    pub(crate) fn record_start(&mut self, index: usize, name: &str) {
        self.records.push(StepRecord {
            index,
            name: name.to_string(),
            status: StepStatus::Executed,
            attempts: 0,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
        });
    }

    /// Mark the last step as failed.
    pub(crate) fn record_failure(&mut self, attempts: u32) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Failed;
            record.attempts = attempts;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Mark the last step as completed successfully.
    pub(crate) fn record_success(&mut self, attempts: u32, compensation_description: String) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Executed;
            record.attempts = attempts;
            record.completed_at = Some(Instant::now());
            record.compensation_description = Some(compensation_description);
        }
    }

    pub(crate) fn record_compensated(&mut self, index: usize) {
        self.set_compensation_status(index, StepStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, index: usize) {
        self.set_compensation_status(index, StepStatus::CompensationFailed);
    }

    pub(crate) fn record_compensation_skipped(&mut self, index: usize) {
        self.set_compensation_status(index, StepStatus::CompensationSkipped);
    }

    fn set_compensation_status(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.records.iter_mut().find(|r| r.index == index) {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Get all records in the audit log.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Get a summary of the saga execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Compensated => "↩",
                StepStatus::CompensationFailed => "⚠",
                StepStatus::CompensationSkipped => "·",
            };
            lines.push(format!("{status} {}", record.name));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_audit_log_is_empty() {
        let log = SagaAuditLog::new();
        assert!(log.records().is_empty());
    }

    #[test]
    fn record_start_adds_step_with_executed_status() {
        let mut log = SagaAuditLog::new();
        log.record_start(0, "test_step");

        assert_eq!(log.records().len(), 1);
        assert_eq!(log.records()[0].name, "test_step");
        assert_eq!(log.records()[0].status, StepStatus::Executed);
        assert!(log.records()[0].completed_at.is_none());
    }

    #[test]
    fn record_failure_updates_last_step() {
        let mut log = SagaAuditLog::new();
        log.record_start(0, "step_1");
        log.record_failure(3);

        assert_eq!(log.records()[0].status, StepStatus::Failed);
        assert_eq!(log.records()[0].attempts, 3);
        assert!(log.records()[0].completed_at.is_some());
    }

    #[test]
    fn record_success_updates_last_step_with_description() {
        let mut log = SagaAuditLog::new();
        log.record_start(0, "step_1");
        log.record_success(1, "undo step_1".to_string());

        assert_eq!(log.records()[0].status, StepStatus::Executed);
        assert!(log.records()[0].completed_at.is_some());
        assert_eq!(
            log.records()[0].compensation_description,
            Some("undo step_1".to_string())
        );
    }

    #[test]
    fn compensation_status_is_matched_by_index() {
        let mut log = SagaAuditLog::new();
        log.record_start(0, "same_name");
        log.record_success(1, "undo".to_string());
        log.record_start(1, "same_name");
        log.record_success(1, "undo".to_string());
        log.record_compensated(1);

        assert_eq!(log.records()[0].status, StepStatus::Executed);
        assert_eq!(log.records()[1].status, StepStatus::Compensated);
    }

    #[test]
    fn summary_shows_every_status() {
        let mut log = SagaAuditLog::new();
        log.record_start(0, "skipped_step");
        log.record_success(1, "nothing".to_string());
        log.record_start(1, "compensated_step");
        log.record_success(1, "undo".to_string());
        log.record_start(2, "comp_failed_step");
        log.record_success(1, "undo".to_string());
        log.record_start(3, "failed_step");
        log.record_failure(1);
        log.record_compensation_failed(2);
        log.record_compensated(1);
        log.record_compensation_skipped(0);

        let summary = log.summary();

        assert!(summary.contains("· skipped_step"));
        assert!(summary.contains("↩ compensated_step"));
        assert!(summary.contains("⚠ comp_failed_step"));
        assert!(summary.contains("✗ failed_step"));
    }
}
