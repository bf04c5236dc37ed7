//! Job builder with validation.

use super::definition::Job;
use crate::core::ExitStatus;
use crate::errors::JobValidationError;
use crate::events::EventSink;
use crate::flow::{FlowController, StatusPattern, TransitionRule, TransitionTable, TransitionTarget};
use crate::step::Step;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builder for [`Job`].
///
/// `start` and `next` describe a straight line: `next` adds a rule from the
/// previous step on `COMPLETED`. Conditional branches are added with `on`,
/// after registering their steps with `step`.
pub struct JobBuilder {
    name: String,
    steps: HashMap<String, Arc<dyn Step>>,
    start: Option<String>,
    last: Option<String>,
    transitions: TransitionTable,
    prevent_restart: bool,
    events: Option<Arc<dyn EventSink>>,
}

impl JobBuilder {
    /// Creates a builder for a job called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: HashMap::new(),
            start: None,
            last: None,
            transitions: TransitionTable::new(),
            prevent_restart: false,
            events: None,
        }
    }

    /// Registers the first step.
    ///
    /// # Errors
    ///
    /// Returns an error if a start step was already set or the name clashes
    /// with a different step.
    pub fn start(mut self, step: Arc<dyn Step>) -> Result<Self, JobValidationError> {
        if let Some(existing) = &self.start {
            return Err(JobValidationError::new(
                "JOB-START-ALREADY-SET",
                format!("Job '{}' already starts with '{existing}'", self.name),
            )
            .with_steps(vec![existing.clone(), step.name().to_string()]));
        }
        let name = self.register(step)?;
        self.start = Some(name.clone());
        self.last = Some(name);
        Ok(self)
    }

    /// Registers a step that runs after the previous one completes.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no previous step or the rule conflicts
    /// with an existing one.
    pub fn next(mut self, step: Arc<dyn Step>) -> Result<Self, JobValidationError> {
        let Some(previous) = self.last.clone() else {
            return Err(JobValidationError::new(
                "JOB-NO-START",
                format!("Job '{}' needs a start step before 'next'", self.name),
            )
            .with_fix_hint("Call start() first."));
        };
        let name = self.register(step)?;
        self.transitions.add(TransitionRule::new(
            previous,
            StatusPattern::from(ExitStatus::Completed),
            TransitionTarget::step(name.clone()),
        ))?;
        self.last = Some(name);
        Ok(self)
    }

    /// Registers a step without wiring it; use `on` to reach it.
    ///
    /// # Errors
    ///
    /// Returns an error if the name clashes with a different step.
    pub fn step(mut self, step: Arc<dyn Step>) -> Result<Self, JobValidationError> {
        self.register(step)?;
        Ok(self)
    }

    /// Adds a rule: after `from` exits with a status matching `pattern`, go
    /// to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if a different rule exists for the same step and
    /// pattern.
    pub fn on(
        mut self,
        from: &str,
        pattern: impl Into<StatusPattern>,
        to: TransitionTarget,
    ) -> Result<Self, JobValidationError> {
        if let TransitionTarget::Step(name) = &to {
            self.last = Some(name.clone());
        }
        self.transitions.add(TransitionRule::new(from, pattern, to))?;
        Ok(self)
    }

    /// Refuses to run again an instance that already has an execution.
    #[must_use]
    pub fn prevent_restart(mut self) -> Self {
        self.prevent_restart = true;
        self
    }

    /// Sets the event sink. Jobs without one use the global sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Builds the job.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no start step or a rule refers to a step
    /// that was never registered.
    pub fn build(self) -> Result<Job, JobValidationError> {
        let Some(start) = self.start else {
            return Err(JobValidationError::new(
                "JOB-NO-START",
                format!("Job '{}' has no start step", self.name),
            )
            .with_fix_hint("Call start() with the first step."));
        };
        let flow = FlowController::new(start, self.steps, self.transitions)?;
        Ok(Job::new(self.name, flow, self.prevent_restart, self.events))
    }

    fn register(&mut self, step: Arc<dyn Step>) -> Result<String, JobValidationError> {
        let name = step.name().to_string();
        if let Some(existing) = self.steps.get(&name) {
            if Arc::ptr_eq(existing, &step) {
                return Ok(name);
            }
            return Err(JobValidationError::new(
                "JOB-DUPLICATE-STEP",
                format!("Job '{}' already has a different step named '{name}'", self.name),
            )
            .with_steps(vec![name]));
        }
        self.steps.insert(name.clone(), step);
        Ok(name)
    }
}

impl fmt::Debug for JobBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobBuilder")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("steps", &self.steps.len())
            .field("transitions", &self.transitions.len())
            .field("prevent_restart", &self.prevent_restart)
            .finish()
    }
}
