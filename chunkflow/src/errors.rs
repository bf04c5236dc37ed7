//! Error types for the chunkflow engine.
//!
//! Read, process and write failures are fatal to the step that raised them.
//! Validation errors come out of the builders, restart errors out of the
//! launcher.

use crate::item::SortKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for chunkflow operations.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The record source could not deliver a page.
    #[error("{0}")]
    Read(#[from] ReadError),

    /// A pipeline stage raised a fault.
    #[error("{0}")]
    Process(#[from] ProcessError),

    /// The record sink rejected a batch.
    #[error("{0}")]
    Write(#[from] WriteError),

    /// A job, step or reader definition is invalid.
    #[error("{0}")]
    Validation(#[from] JobValidationError),

    /// The launcher refused to start a job instance.
    #[error("{0}")]
    Restart(#[from] JobRestartError),

    /// A tasklet reported a failure.
    #[error("Tasklet failed: {0}")]
    Tasklet(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// Creates a tasklet failure.
    #[must_use]
    pub fn tasklet(message: impl Into<String>) -> Self {
        Self::Tasklet(message.into())
    }

    /// Returns a stable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Process(_) => "process",
            Self::Write(_) => "write",
            Self::Validation(_) => "validation",
            Self::Restart(_) => "restart",
            Self::Tasklet(_) => "tasklet",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Error raised when a page cannot be read or decoded.
#[derive(Debug, Clone, Error)]
#[error("Read error in '{reader}': {message}")]
pub struct ReadError {
    /// The reader (or source) name.
    pub reader: String,
    /// What went wrong.
    pub message: String,
    /// The last key successfully read before the failure.
    pub last_key: Option<SortKey>,
}

impl ReadError {
    /// Creates a new read error.
    #[must_use]
    pub fn new(reader: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reader: reader.into(),
            message: message.into(),
            last_key: None,
        }
    }

    /// Records the cursor position at the time of failure.
    #[must_use]
    pub fn with_last_key(mut self, key: Option<SortKey>) -> Self {
        self.last_key = key;
        self
    }

    /// A row did not carry the column used for ordering.
    #[must_use]
    pub fn missing_sort_key(reader: impl Into<String>, column: &str) -> Self {
        Self::new(reader, format!("row has no usable sort key column '{column}'"))
    }

    /// A row could not be decoded into a record.
    #[must_use]
    pub fn malformed_row(column: &str, expected: &str) -> Self {
        Self::new(
            "row-decoder",
            format!("column '{column}' is missing or is not {expected}"),
        )
    }
}

/// Error raised when a pipeline stage faults instead of filtering.
#[derive(Debug, Clone, Error)]
#[error("Process error in stage '{stage}': {message}")]
pub struct ProcessError {
    /// The stage that raised the fault.
    pub stage: String,
    /// What went wrong.
    pub message: String,
}

impl ProcessError {
    /// Creates a new process error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            stage: "anonymous".to_string(),
            message: message.into(),
        }
    }

    /// Attributes the error to a named stage.
    #[must_use]
    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }
}

/// Error raised when a sink rejects a batch.
#[derive(Debug, Clone, Error)]
#[error("Write error ({batch_size} items): {message}")]
pub struct WriteError {
    /// What went wrong.
    pub message: String,
    /// Size of the rejected batch.
    pub batch_size: usize,
}

impl WriteError {
    /// Creates a new write error.
    #[must_use]
    pub fn new(message: impl Into<String>, batch_size: usize) -> Self {
        Self {
            message: message.into(),
            batch_size,
        }
    }
}

/// Error raised when a job or component definition is invalid.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct JobValidationError {
    /// The error message.
    pub message: String,
    /// Error code (e.g. "JOB-UNKNOWN-STEP").
    pub code: String,
    /// The steps involved in the error.
    pub steps: Vec<String>,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl JobValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            steps: Vec::new(),
            fix_hint: None,
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("steps".to_string(), serde_json::json!(self.steps));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        map
    }
}

/// Errors raised by the launcher when a job instance may not run.
#[derive(Debug, Clone, Error)]
pub enum JobRestartError {
    /// The instance already completed successfully.
    #[error("Job instance already complete: {job} ({instance_key})")]
    AlreadyComplete {
        /// The job name.
        job: String,
        /// The instance key derived from the parameters.
        instance_key: String,
    },

    /// Another execution of the instance is still running.
    #[error("Job instance already running: {job} ({instance_key})")]
    AlreadyRunning {
        /// The job name.
        job: String,
        /// The instance key derived from the parameters.
        instance_key: String,
    },

    /// The job forbids restarting an instance that already ran.
    #[error("Job '{job}' is not restartable and instance {instance_key} already ran")]
    RestartPrevented {
        /// The job name.
        job: String,
        /// The instance key derived from the parameters.
        instance_key: String,
    },
}

impl JobRestartError {
    /// Returns the job name the refusal concerns.
    #[must_use]
    pub fn job(&self) -> &str {
        match self {
            Self::AlreadyComplete { job, .. }
            | Self::AlreadyRunning { job, .. }
            | Self::RestartPrevented { job, .. } => job,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_kind() {
        let err: BatchError = ReadError::new("reader", "boom").into();
        assert_eq!(err.kind(), "read");

        let err: BatchError = WriteError::new("rejected", 3).into();
        assert_eq!(err.kind(), "write");
        assert!(err.to_string().contains("3 items"));
    }

    #[test]
    fn test_process_error_stage_attribution() {
        let err = ProcessError::new("bad input").in_stage("greet");
        assert_eq!(err.stage, "greet");
        assert!(err.to_string().contains("greet"));
    }

    #[test]
    fn test_read_error_carries_cursor() {
        let err = ReadError::new("teachers", "connection reset").with_last_key(Some(SortKey::Int(7)));
        assert_eq!(err.last_key, Some(SortKey::Int(7)));
    }

    #[test]
    fn test_validation_error_to_dict() {
        let err = JobValidationError::new("JOB-UNKNOWN-STEP", "unknown step 'x'")
            .with_steps(vec!["x".to_string()])
            .with_fix_hint("register the step first");

        let dict = err.to_dict();
        assert_eq!(dict.get("code").unwrap(), "JOB-UNKNOWN-STEP");
        assert!(dict.contains_key("fix_hint"));
    }

    #[test]
    fn test_batch_error_to_dict() {
        let err = BatchError::tasklet("nope");
        let dict = err.to_dict();
        assert_eq!(dict.get("kind").unwrap(), "tasklet");
    }

    #[test]
    fn test_restart_error_job_name() {
        let err = JobRestartError::RestartPrevented {
            job: "convert".to_string(),
            instance_key: "abc".to_string(),
        };
        assert_eq!(err.job(), "convert");
    }
}
