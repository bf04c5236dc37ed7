//! Test assertions for job executions.

use crate::core::{BatchStatus, ExitStatus};
use crate::job::JobExecution;

/// Asserts that the job completed.
pub fn assert_job_completed(execution: &JobExecution) {
    assert_eq!(
        execution.status,
        BatchStatus::Completed,
        "Expected job '{}' to complete, got {} (steps: {:?})",
        execution.job_name,
        execution.status,
        execution.step_names()
    );
}

/// Asserts that the job failed.
pub fn assert_job_failed(execution: &JobExecution) {
    assert_eq!(
        execution.status,
        BatchStatus::Failed,
        "Expected job '{}' to fail, got {}",
        execution.job_name,
        execution.status
    );
}

/// Asserts the order in which steps ran.
pub fn assert_step_sequence(execution: &JobExecution, expected: &[&str]) {
    assert_eq!(
        execution.step_names(),
        expected,
        "Unexpected step sequence for job '{}'",
        execution.job_name
    );
}

/// Asserts the exit status of the last run of a step.
pub fn assert_exit_status(execution: &JobExecution, step: &str, expected: &ExitStatus) {
    let actual = execution.step(step).map(|s| &s.exit_status);
    assert_eq!(
        actual,
        Some(expected),
        "Expected step '{step}' to exit with {expected}, got {actual:?}"
    );
}
