//! Execution context handed to steps and tasklets.

use crate::core::{ExitStatus, JobParameters};
use crate::events::{get_event_sink, EventSink};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Read-only view of the running job, shared by every step of one run.
#[derive(Debug, Clone)]
pub struct StepContext {
    job_name: String,
    execution_id: Uuid,
    parameters: Arc<JobParameters>,
    events: Arc<dyn EventSink>,
}

impl StepContext {
    /// Creates a context for a fresh execution using the global event sink.
    #[must_use]
    pub fn new(job_name: impl Into<String>, parameters: JobParameters) -> Self {
        Self {
            job_name: job_name.into(),
            execution_id: Uuid::new_v4(),
            parameters: Arc::new(parameters),
            events: get_event_sink(),
        }
    }

    /// Sets the execution id.
    #[must_use]
    pub fn with_execution_id(mut self, id: Uuid) -> Self {
        self.execution_id = id;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the job name.
    #[must_use]
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Returns the execution id.
    #[must_use]
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Returns the job parameters.
    #[must_use]
    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    /// Returns the event sink.
    #[must_use]
    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Emits an event tagged with the job name and execution id.
    pub async fn emit(&self, event_type: &str, mut data: Value) {
        if let Value::Object(ref mut map) = data {
            map.insert("job".to_string(), Value::from(self.job_name.as_str()));
            map.insert(
                "execution_id".to_string(),
                Value::from(self.execution_id.to_string()),
            );
        }
        self.events.emit(event_type, Some(data)).await;
    }

    pub(crate) fn contribution(&self, step_name: &str) -> StepContribution {
        StepContribution::new(step_name, Arc::clone(&self.parameters))
    }
}

/// Mutable per-step state a tasklet can write to.
///
/// Besides counters, a contribution carries the exit-status override: when
/// set it replaces the natural `COMPLETED`/`FAILED` outcome of the step.
#[derive(Debug, Clone)]
pub struct StepContribution {
    step_name: String,
    parameters: Arc<JobParameters>,
    exit_status: Option<ExitStatus>,
    read_count: usize,
    filter_count: usize,
    write_count: usize,
}

impl StepContribution {
    /// Creates an empty contribution.
    #[must_use]
    pub fn new(step_name: impl Into<String>, parameters: Arc<JobParameters>) -> Self {
        Self {
            step_name: step_name.into(),
            parameters,
            exit_status: None,
            read_count: 0,
            filter_count: 0,
            write_count: 0,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Returns the job parameters.
    #[must_use]
    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    /// Overrides the step's exit status.
    pub fn set_exit_status(&mut self, status: impl Into<ExitStatus>) {
        self.exit_status = Some(status.into());
    }

    /// Returns the override, if one was set.
    #[must_use]
    pub fn exit_status(&self) -> Option<&ExitStatus> {
        self.exit_status.as_ref()
    }

    /// Adds to the read count.
    pub fn increment_read_count(&mut self, count: usize) {
        self.read_count += count;
    }

    /// Adds to the filter count.
    pub fn increment_filter_count(&mut self, count: usize) {
        self.filter_count += count;
    }

    /// Adds to the write count.
    pub fn increment_write_count(&mut self, count: usize) {
        self.write_count += count;
    }

    /// Returns the read count.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.read_count
    }

    /// Returns the filter count.
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.filter_count
    }

    /// Returns the write count.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.write_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use serde_json::json;

    #[tokio::test]
    async fn test_emit_tags_job_and_execution() {
        let sink = Arc::new(CollectingEventSink::new());
        let id = Uuid::new_v4();
        let ctx = StepContext::new("simpleJob", JobParameters::new())
            .with_execution_id(id)
            .with_event_sink(sink.clone());

        ctx.emit("step.started", json!({"step": "simpleStep1"})).await;

        let events = sink.events();
        let data = events[0].1.as_ref().unwrap();
        assert_eq!(data["job"], "simpleJob");
        assert_eq!(data["execution_id"], id.to_string());
        assert_eq!(data["step"], "simpleStep1");
    }

    #[test]
    fn test_contribution_override_and_counts() {
        let ctx = StepContext::new("job", JobParameters::new().with_string("requestDate", "20240101"));
        let mut contribution = ctx.contribution("step1");

        assert!(contribution.exit_status().is_none());
        contribution.set_exit_status("FAILED");
        assert_eq!(contribution.exit_status(), Some(&ExitStatus::Failed));

        contribution.increment_read_count(3);
        contribution.increment_write_count(2);
        contribution.increment_filter_count(1);
        assert_eq!(
            (contribution.read_count(), contribution.write_count(), contribution.filter_count()),
            (3, 2, 1)
        );
        assert_eq!(contribution.parameters().get_string("requestDate"), Some("20240101"));
    }
}
