//! Per-step execution records.

use super::context::StepContribution;
use crate::core::{BatchStatus, ExitStatus};
use crate::errors::BatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Error kind (`read`, `process`, `write`, ...).
    pub kind: String,
    /// Error message.
    pub message: String,
}

impl From<&BatchError> for StepFailure {
    fn from(error: &BatchError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// What happened during one run of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    /// The step name.
    pub step_name: String,
    /// Lifecycle status.
    pub status: BatchStatus,
    /// Exit status seen by the flow.
    pub exit_status: ExitStatus,
    /// Records read from the source.
    pub read_count: usize,
    /// Records dropped by the processing pipeline.
    pub filter_count: usize,
    /// Items accepted by the sink.
    pub write_count: usize,
    /// Chunks (or tasklet iterations) committed.
    pub commit_count: usize,
    /// When the step started.
    pub started_at: DateTime<Utc>,
    /// When the step reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
    /// The error that failed the step.
    pub failure: Option<StepFailure>,
}

impl StepExecution {
    /// Creates a record for a step that is starting now.
    #[must_use]
    pub fn start(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            status: BatchStatus::Started,
            exit_status: ExitStatus::Completed,
            read_count: 0,
            filter_count: 0,
            write_count: 0,
            commit_count: 0,
            started_at: Utc::now(),
            ended_at: None,
            failure: None,
        }
    }

    /// Marks the step as completed.
    pub fn complete(&mut self) {
        self.status = BatchStatus::Completed;
        self.exit_status = ExitStatus::Completed;
        self.ended_at = Some(Utc::now());
    }

    /// Marks the step as failed with `error`.
    pub fn fail(&mut self, error: &BatchError) {
        self.status = BatchStatus::Failed;
        self.exit_status = ExitStatus::Failed;
        self.failure = Some(StepFailure::from(error));
        self.ended_at = Some(Utc::now());
    }

    /// Replaces the natural exit status. The batch status is left alone.
    pub fn override_exit_status(&mut self, status: ExitStatus) {
        self.exit_status = status;
    }

    /// Copies counters and any exit-status override from a contribution.
    pub fn apply_contribution(&mut self, contribution: &StepContribution) {
        self.read_count += contribution.read_count();
        self.filter_count += contribution.filter_count();
        self.write_count += contribution.write_count();
        if let Some(status) = contribution.exit_status() {
            self.exit_status = status.clone();
        }
    }

    /// Returns true if the step failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == BatchStatus::Failed
    }

    /// Returns the elapsed time in milliseconds, if the step has ended.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
