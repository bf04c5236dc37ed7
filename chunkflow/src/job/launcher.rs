//! Launching jobs under the restart policy.

use super::definition::Job;
use super::execution::{instance_key, JobExecution};
use super::repository::JobRepository;
use crate::core::JobParameters;
use crate::errors::BatchError;
use crate::events::types;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Runs jobs and records their executions.
///
/// An instance (job name plus parameters) that is running or already
/// completed is never started again. A job built with `prevent_restart` also
/// refuses an instance that ran before and failed. The execution is stored
/// as `STARTED` before the first step runs and updated when the job ends.
#[derive(Debug, Clone)]
pub struct JobLauncher {
    repository: Arc<dyn JobRepository>,
}

impl JobLauncher {
    /// Creates a launcher backed by `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self { repository }
    }

    /// Returns the repository.
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn JobRepository> {
        &self.repository
    }

    /// Runs `job` with `parameters` and stores the execution.
    ///
    /// A failed run is still `Ok`; inspect the returned execution's status.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Restart`] if the instance may not run, or any
    /// error raised by the repository.
    pub async fn run(&self, job: &Job, parameters: JobParameters) -> Result<JobExecution, BatchError> {
        let execution = match self
            .repository
            .create_execution(job.name(), &parameters, job.is_restartable())
            .await
        {
            Ok(execution) => execution,
            Err(BatchError::Restart(error)) => {
                let key = instance_key(job.name(), &parameters);
                warn!(job = %job.name(), instance_key = %key, error = %error, "Job launch refused");
                job.event_sink().try_emit(
                    types::JOB_REFUSED,
                    Some(json!({"job": job.name(), "instance_key": key, "reason": error.to_string()})),
                );
                return Err(error.into());
            }
            Err(other) => return Err(other),
        };

        let execution = job.execute(execution).await;
        self.repository.save(&execution).await?;
        Ok(execution)
    }
}
