//! Job execution records.

use crate::core::{BatchStatus, ExitStatus, JobParameters};
use crate::step::StepExecution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened during one run of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    /// Unique id of this run.
    pub id: Uuid,
    /// The job name.
    pub job_name: String,
    /// Identity of the job instance (job name plus parameters).
    pub instance_key: String,
    /// The parameters the job ran with.
    pub parameters: JobParameters,
    /// Overall lifecycle status.
    pub status: BatchStatus,
    /// Overall exit status.
    pub exit_status: ExitStatus,
    /// Step executions in the order they ran.
    pub step_executions: Vec<StepExecution>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: Option<DateTime<Utc>>,
}

impl JobExecution {
    /// Creates a record for a run starting now.
    #[must_use]
    pub fn start(job_name: impl Into<String>, parameters: JobParameters) -> Self {
        let job_name = job_name.into();
        Self {
            id: Uuid::new_v4(),
            instance_key: instance_key(&job_name, &parameters),
            job_name,
            parameters,
            status: BatchStatus::Started,
            exit_status: ExitStatus::Completed,
            step_executions: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Returns the last execution of the named step.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepExecution> {
        self.step_executions.iter().rev().find(|s| s.step_name == name)
    }

    /// Returns step names in the order they ran.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.step_executions
            .iter()
            .map(|s| s.step_name.as_str())
            .collect()
    }

    /// Returns true if the job completed.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status == BatchStatus::Completed
    }

    /// Returns the elapsed time in milliseconds, if the job has ended.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Derives the job instance key: an MD5 digest over the job name and the
/// canonical parameter string.
#[must_use]
pub fn instance_key(job_name: &str, parameters: &JobParameters) -> String {
    JobParameters::new()
        .with_string("job.name", job_name)
        .with_string("job.parameters", parameters.to_canonical_string())
        .instance_key()
}
