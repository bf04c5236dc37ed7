//! Tasklet steps for work that is not item-oriented.

use super::context::{StepContext, StepContribution};
use super::execution::StepExecution;
use super::{ExitStatusListener, Step};
use crate::core::RepeatStatus;
use crate::errors::BatchError;
use crate::events::types;
use async_trait::async_trait;
use serde_json::json;
use std::fmt::{self, Debug};
use std::sync::Arc;
use tracing::{info, warn};

/// A unit of work invoked until it reports [`RepeatStatus::Finished`].
#[async_trait]
pub trait Tasklet: Send + Sync + Debug {
    /// Runs one iteration.
    async fn execute(&self, contribution: &mut StepContribution) -> Result<RepeatStatus, BatchError>;
}

/// A tasklet backed by a synchronous closure.
pub struct FnTasklet<F> {
    name: String,
    func: F,
}

impl<F> FnTasklet<F>
where
    F: Fn(&mut StepContribution) -> Result<RepeatStatus, BatchError> + Send + Sync,
{
    /// Creates a tasklet from a closure.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnTasklet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTasklet").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Tasklet for FnTasklet<F>
where
    F: Fn(&mut StepContribution) -> Result<RepeatStatus, BatchError> + Send + Sync,
{
    async fn execute(&self, contribution: &mut StepContribution) -> Result<RepeatStatus, BatchError> {
        (self.func)(contribution)
    }
}

/// A step that repeatedly invokes a [`Tasklet`].
pub struct TaskletStep {
    name: String,
    tasklet: Arc<dyn Tasklet>,
    max_iterations: Option<usize>,
    listener: Option<Box<dyn ExitStatusListener>>,
}

impl TaskletStep {
    /// Creates a tasklet step.
    #[must_use]
    pub fn new(name: impl Into<String>, tasklet: Arc<dyn Tasklet>) -> Self {
        Self {
            name: name.into(),
            tasklet,
            max_iterations: None,
            listener: None,
        }
    }

    /// Creates a tasklet step from a closure.
    #[must_use]
    pub fn from_fn<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut StepContribution) -> Result<RepeatStatus, BatchError> + Send + Sync + 'static,
    {
        let name = name.into();
        let tasklet = Arc::new(FnTasklet::new(name.clone(), func));
        Self::new(name, tasklet)
    }

    /// Fails the step if the tasklet is still continuable after `limit`
    /// invocations.
    #[must_use]
    pub fn with_max_iterations(mut self, limit: usize) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    /// Sets a listener that may replace the step's exit status.
    #[must_use]
    pub fn with_exit_status_listener(mut self, listener: impl ExitStatusListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    async fn run_iterations(
        &self,
        contribution: &mut StepContribution,
        execution: &mut StepExecution,
    ) -> Result<(), BatchError> {
        loop {
            let status = self.tasklet.execute(contribution).await?;
            execution.commit_count += 1;
            if !status.is_continuable() {
                return Ok(());
            }
            if let Some(limit) = self.max_iterations {
                if execution.commit_count >= limit {
                    return Err(BatchError::tasklet(format!(
                        "'{}' still continuable after {limit} iterations",
                        self.name
                    )));
                }
            }
        }
    }
}

impl Debug for TaskletStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskletStep")
            .field("name", &self.name)
            .field("tasklet", &self.tasklet)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for TaskletStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &StepContext) -> StepExecution {
        let mut execution = StepExecution::start(&self.name);
        info!(step = %self.name, "Step started");
        ctx.emit(types::STEP_STARTED, json!({"step": self.name})).await;

        let mut contribution = ctx.contribution(&self.name);
        match self.run_iterations(&mut contribution, &mut execution).await {
            Ok(()) => execution.complete(),
            Err(error) => {
                warn!(step = %self.name, error = %error, "Step failed");
                execution.fail(&error);
            }
        }
        execution.apply_contribution(&contribution);
        if let Some(status) = self.listener.as_ref().and_then(|l| l.after_step(&execution)) {
            execution.override_exit_status(status);
        }

        super::report_finished(ctx, &execution).await;
        execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BatchStatus, ExitStatus, JobParameters};
    use crate::testing::RecordingTasklet;

    fn ctx() -> StepContext {
        StepContext::new("tasklet-job", JobParameters::new().with_string("requestDate", "20240101"))
    }

    #[tokio::test]
    async fn test_finished_runs_once() {
        let step = TaskletStep::from_fn("step1", |_c: &mut StepContribution| Ok(RepeatStatus::Finished));
        let execution = step.execute(&ctx()).await;

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(execution.exit_status, ExitStatus::Completed);
        assert_eq!(execution.commit_count, 1);
    }

    #[tokio::test]
    async fn test_continuable_reinvokes() {
        let tasklet = Arc::new(RecordingTasklet::continuable_for(3));
        let step = TaskletStep::new("repeat", tasklet.clone());

        let execution = step.execute(&ctx()).await;

        assert_eq!(tasklet.calls(), 4);
        assert_eq!(execution.commit_count, 4);
        assert_eq!(execution.status, BatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_max_iterations_guard() {
        let tasklet = Arc::new(RecordingTasklet::continuable_for(usize::MAX));
        let step = TaskletStep::new("runaway", tasklet.clone()).with_max_iterations(5);

        let execution = step.execute(&ctx()).await;

        assert_eq!(tasklet.calls(), 5);
        assert!(execution.is_failed());
        assert_eq!(execution.failure.unwrap().kind, "tasklet");
    }

    #[tokio::test]
    async fn test_contribution_sets_exit_status() {
        let step = TaskletStep::from_fn("step1", |c: &mut StepContribution| {
            c.set_exit_status(ExitStatus::Failed);
            Ok(RepeatStatus::Finished)
        });
        let execution = step.execute(&ctx()).await;

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(execution.exit_status, ExitStatus::Failed);
    }

    #[tokio::test]
    async fn test_error_fails_step() {
        let step = TaskletStep::from_fn("broken", |_c: &mut StepContribution| {
            Err(BatchError::tasklet("no connection"))
        });
        let execution = step.execute(&ctx()).await;

        assert_eq!(execution.exit_status, ExitStatus::Failed);
        assert!(execution.failure.unwrap().message.contains("no connection"));
    }

    #[tokio::test]
    async fn test_tasklet_reads_parameters() {
        let tasklet = Arc::new(RecordingTasklet::finished());
        let step = TaskletStep::new("simpleStep1", tasklet.clone());
        step.execute(&ctx()).await;

        assert_eq!(tasklet.seen_parameters()[0].get_string("requestDate"), Some("20240101"));
    }
}
