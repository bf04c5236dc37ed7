//! Steps: the units a flow sequences.
//!
//! A step runs to completion and reports a [`StepExecution`]; it never
//! returns an error. Failures are recorded as a `FAILED` status so the flow
//! can route on them.

mod chunk;
mod context;
mod execution;
mod tasklet;

pub use chunk::{ChunkStep, ChunkStepBuilder};
pub use context::{StepContext, StepContribution};
pub use execution::{StepExecution, StepFailure};
pub use tasklet::{FnTasklet, Tasklet, TaskletStep};

use crate::core::ExitStatus;
use crate::events::types;
use async_trait::async_trait;
use serde_json::json;
use std::fmt::Debug;
use tracing::info;

/// A runnable step.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the step name, unique within a job.
    fn name(&self) -> &str;

    /// Runs the step to a terminal status.
    async fn execute(&self, ctx: &StepContext) -> StepExecution;
}

/// Inspects a finished step and may replace its exit status.
pub trait ExitStatusListener: Send + Sync {
    /// Returns the exit status to report instead, or `None` to keep it.
    fn after_step(&self, execution: &StepExecution) -> Option<ExitStatus>;
}

impl<F> ExitStatusListener for F
where
    F: Fn(&StepExecution) -> Option<ExitStatus> + Send + Sync,
{
    fn after_step(&self, execution: &StepExecution) -> Option<ExitStatus> {
        self(execution)
    }
}

async fn report_finished(ctx: &StepContext, execution: &StepExecution) {
    info!(
        step = %execution.step_name,
        status = %execution.status,
        exit_status = %execution.exit_status,
        read = execution.read_count,
        written = execution.write_count,
        filtered = execution.filter_count,
        "Step finished"
    );
    let event_type = if execution.is_failed() {
        types::STEP_FAILED
    } else {
        types::STEP_COMPLETED
    };
    ctx.emit(
        event_type,
        json!({
            "step": execution.step_name,
            "status": execution.status,
            "exit_status": execution.exit_status,
            "read_count": execution.read_count,
            "filter_count": execution.filter_count,
            "write_count": execution.write_count,
            "commit_count": execution.commit_count,
        }),
    )
    .await;
}
