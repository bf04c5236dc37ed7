//! Storage of job executions.

use super::execution::JobExecution;
use crate::core::JobParameters;
use crate::errors::{BatchError, JobRestartError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::Debug;

/// Persists job executions, grouped by job instance.
#[async_trait]
pub trait JobRepository: Send + Sync + Debug {
    /// Returns every execution of the instance, oldest first.
    async fn find_executions(&self, instance_key: &str) -> Result<Vec<JobExecution>, BatchError>;

    /// Inserts an execution, or replaces the stored one with the same id.
    async fn save(&self, execution: &JobExecution) -> Result<(), BatchError>;

    /// Checks the instance's history with [`check_restart`] and, if the run
    /// may go ahead, stores and returns a new `STARTED` execution. The check
    /// and the insert must be atomic per instance.
    async fn create_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
        restartable: bool,
    ) -> Result<JobExecution, BatchError>;

    /// Returns the most recent execution of the instance.
    async fn last_execution(&self, instance_key: &str) -> Result<Option<JobExecution>, BatchError> {
        Ok(self.find_executions(instance_key).await?.pop())
    }
}

/// Decides whether a new execution of an instance may start.
///
/// A running execution always blocks, as does a completed one. A job that
/// is not restartable is also refused once any execution exists.
pub fn check_restart(
    job_name: &str,
    instance_key: &str,
    previous: &[JobExecution],
    restartable: bool,
) -> Result<(), JobRestartError> {
    let job = job_name.to_string();
    let instance_key = instance_key.to_string();
    if previous.iter().any(|e| !e.status.is_terminal()) {
        Err(JobRestartError::AlreadyRunning { job, instance_key })
    } else if previous.iter().any(JobExecution::is_successful) {
        Err(JobRestartError::AlreadyComplete { job, instance_key })
    } else if !restartable && !previous.is_empty() {
        Err(JobRestartError::RestartPrevented { job, instance_key })
    } else {
        Ok(())
    }
}

/// A repository kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    instances: DashMap<String, Vec<JobExecution>>,
}

impl InMemoryJobRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of known job instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Forgets every execution.
    pub fn clear(&self) {
        self.instances.clear();
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn find_executions(&self, instance_key: &str) -> Result<Vec<JobExecution>, BatchError> {
        Ok(self
            .instances
            .get(instance_key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn save(&self, execution: &JobExecution) -> Result<(), BatchError> {
        let mut entry = self
            .instances
            .entry(execution.instance_key.clone())
            .or_default();
        match entry.iter_mut().find(|e| e.id == execution.id) {
            Some(stored) => *stored = execution.clone(),
            None => entry.push(execution.clone()),
        }
        Ok(())
    }

    async fn create_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
        restartable: bool,
    ) -> Result<JobExecution, BatchError> {
        let execution = JobExecution::start(job_name, parameters.clone());
        // the entry guard holds the shard lock across check and insert
        let mut entry = self
            .instances
            .entry(execution.instance_key.clone())
            .or_default();
        check_restart(job_name, &execution.instance_key, &entry, restartable)?;
        entry.push(execution.clone());
        Ok(execution)
    }
}
