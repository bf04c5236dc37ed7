//! Mock collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::{ExitStatus, JobParameters, RepeatStatus};
use crate::errors::{BatchError, ReadError, WriteError};
use crate::item::{InMemoryRecordSource, PageRequest, RecordSink, RecordSource, Row};
use crate::step::{Step, StepContext, StepContribution, StepExecution, Tasklet};

/// A record source that serves a fixed number of fetches, then fails.
#[derive(Debug)]
pub struct FailingSource {
    inner: InMemoryRecordSource,
    healthy_fetches: usize,
    fetches: AtomicUsize,
}

impl FailingSource {
    /// Serves `fetches` successful fetches over `rows`, then fails every call.
    #[must_use]
    pub fn after_pages(rows: Vec<Row>, fetches: usize) -> Self {
        Self {
            inner: InMemoryRecordSource::new("failing", rows),
            healthy_fetches: fetches,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Vec<Row>, ReadError> {
        let call = self.fetches.fetch_add(1, Ordering::SeqCst);
        if call >= self.healthy_fetches {
            return Err(ReadError::new("failing", "connection reset"));
        }
        self.inner.fetch_page(request).await
    }
}

/// A sink that rejects its first calls and records what it accepts.
pub struct FailingSink<T> {
    failures_left: Mutex<usize>,
    accepted: Mutex<Vec<Vec<T>>>,
}

impl<T: Clone> FailingSink<T> {
    /// Rejects the first `failures` batches.
    #[must_use]
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures_left: Mutex::new(failures),
            accepted: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every batch.
    #[must_use]
    pub fn always() -> Self {
        Self::failing_first(usize::MAX)
    }

    /// Returns the accepted batches.
    #[must_use]
    pub fn accepted(&self) -> Vec<Vec<T>> {
        self.accepted.lock().clone()
    }
}

impl<T> Debug for FailingSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailingSink")
            .field("failures_left", &*self.failures_left.lock())
            .field("accepted", &self.accepted.lock().len())
            .finish()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> RecordSink<T> for FailingSink<T> {
    async fn write_batch(&self, items: &[T]) -> Result<(), WriteError> {
        {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(WriteError::new("sink unavailable", items.len()));
            }
        }
        self.accepted.lock().push(items.to_vec());
        Ok(())
    }
}

/// A tasklet that counts invocations and records the parameters it saw.
#[derive(Debug, Default)]
pub struct RecordingTasklet {
    continuable: usize,
    calls: AtomicUsize,
    parameters: Mutex<Vec<JobParameters>>,
}

impl RecordingTasklet {
    /// Finishes on the first call.
    #[must_use]
    pub fn finished() -> Self {
        Self::default()
    }

    /// Returns `Continuable` for the first `times` calls, then `Finished`.
    #[must_use]
    pub fn continuable_for(times: usize) -> Self {
        Self {
            continuable: times,
            ..Self::default()
        }
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the parameters seen on each invocation.
    #[must_use]
    pub fn seen_parameters(&self) -> Vec<JobParameters> {
        self.parameters.lock().clone()
    }
}

#[async_trait]
impl Tasklet for RecordingTasklet {
    async fn execute(&self, contribution: &mut StepContribution) -> Result<RepeatStatus, BatchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.parameters.lock().push(contribution.parameters().clone());
        if call < self.continuable {
            Ok(RepeatStatus::Continuable)
        } else {
            Ok(RepeatStatus::Finished)
        }
    }
}

/// A step that always ends with the same exit status.
#[derive(Debug)]
pub struct StaticStep {
    name: String,
    exit_status: ExitStatus,
    calls: AtomicUsize,
}

impl StaticStep {
    /// Creates a step ending with `exit_status`. A `FAILED` code also marks
    /// the step itself as failed.
    #[must_use]
    pub fn new(name: impl Into<String>, exit_status: impl Into<ExitStatus>) -> Self {
        Self {
            name: name.into(),
            exit_status: exit_status.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a step that completes.
    #[must_use]
    pub fn completed(name: impl Into<String>) -> Self {
        Self::new(name, ExitStatus::Completed)
    }

    /// Creates a step that fails.
    #[must_use]
    pub fn failed(name: impl Into<String>) -> Self {
        Self::new(name, ExitStatus::Failed)
    }

    /// Returns the number of executions.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Step for StaticStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &StepContext) -> StepExecution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut execution = StepExecution::start(&self.name);
        if self.exit_status.is_failed() {
            execution.fail(&BatchError::tasklet("static failure"));
        } else {
            execution.complete();
            execution.override_exit_status(self.exit_status.clone());
        }
        execution
    }
}
