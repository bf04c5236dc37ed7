//! A named, runnable flow of steps.

use super::execution::JobExecution;
use crate::core::{BatchStatus, JobParameters};
use crate::events::{get_event_sink, types, EventSink};
use crate::flow::FlowController;
use crate::step::StepContext;
use chrono::Utc;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// A job: a flow of steps plus a restart policy.
///
/// Jobs are immutable once built and may be run any number of times; each
/// run yields a fresh [`JobExecution`]. Restart rules are enforced by
/// [`JobLauncher`](super::JobLauncher), not by `run` itself.
#[derive(Clone)]
pub struct Job {
    name: String,
    flow: FlowController,
    prevent_restart: bool,
    events: Option<Arc<dyn EventSink>>,
}

impl Job {
    pub(crate) fn new(
        name: String,
        flow: FlowController,
        prevent_restart: bool,
        events: Option<Arc<dyn EventSink>>,
    ) -> Self {
        Self {
            name,
            flow,
            prevent_restart,
            events,
        }
    }

    /// Returns the job name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns false if an instance that already ran may not run again.
    #[must_use]
    pub fn is_restartable(&self) -> bool {
        !self.prevent_restart
    }

    /// Returns the flow.
    #[must_use]
    pub fn flow(&self) -> &FlowController {
        &self.flow
    }

    /// Returns the sink this job reports to: its own if one was set on the
    /// builder, the global sink otherwise.
    #[must_use]
    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        self.events.clone().unwrap_or_else(get_event_sink)
    }

    /// Runs the job with `parameters`.
    pub async fn run(&self, parameters: JobParameters) -> JobExecution {
        self.execute(JobExecution::start(&self.name, parameters)).await
    }

    /// Runs the flow into an execution record created beforehand.
    pub(crate) async fn execute(&self, mut execution: JobExecution) -> JobExecution {
        let ctx = StepContext::new(&self.name, execution.parameters.clone())
            .with_execution_id(execution.id)
            .with_event_sink(self.event_sink());

        info!(job = %self.name, execution_id = %execution.id, "Job started");
        ctx.emit(
            types::JOB_STARTED,
            json!({"instance_key": execution.instance_key, "parameters": execution.parameters}),
        )
        .await;

        let outcome = self.flow.run(&ctx).await;
        execution.status = outcome.status;
        execution.exit_status = outcome.exit_status;
        execution.step_executions = outcome.step_executions;
        execution.ended_at = Some(Utc::now());

        let event_type = if execution.status == BatchStatus::Completed {
            info!(job = %self.name, exit_status = %execution.exit_status, "Job completed");
            types::JOB_COMPLETED
        } else {
            warn!(job = %self.name, exit_status = %execution.exit_status, "Job failed");
            types::JOB_FAILED
        };
        ctx.emit(
            event_type,
            json!({
                "status": execution.status,
                "exit_status": execution.exit_status,
                "steps": execution.step_names(),
                "end": outcome.end,
            }),
        )
        .await;

        execution
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("flow", &self.flow)
            .field("prevent_restart", &self.prevent_restart)
            .finish_non_exhaustive()
    }
}
