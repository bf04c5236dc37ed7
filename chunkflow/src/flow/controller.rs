//! Runs steps in the order the transition table dictates.

use super::transition::{TransitionRule, TransitionTable, TransitionTarget};
use crate::core::{BatchStatus, ExitStatus};
use crate::errors::JobValidationError;
use crate::events::types;
use crate::step::{Step, StepContext, StepExecution};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEnd {
    /// An `END` rule matched.
    Explicit,
    /// No rule matched the last step's exit status.
    Implicit,
}

/// Result of running a flow.
#[derive(Debug, Clone, Serialize)]
pub struct FlowOutcome {
    /// `Completed` or `Failed`.
    pub status: BatchStatus,
    /// Exit status of the flow as a whole.
    pub exit_status: ExitStatus,
    /// Every step execution, in the order steps ran.
    pub step_executions: Vec<StepExecution>,
    /// How the flow ended.
    pub end: FlowEnd,
}

/// Sequences steps using a [`TransitionTable`].
///
/// Starting from the start step, each step runs to completion and its exit
/// status is looked up: an exact rule beats the wildcard, `END` finishes
/// successfully, a step target runs next. When nothing matches, a failed
/// step fails the flow and any other outcome ends it successfully.
///
/// Cycles in the table are not rejected; a table that loops forever will
/// run forever.
#[derive(Clone)]
pub struct FlowController {
    start: String,
    steps: HashMap<String, Arc<dyn Step>>,
    transitions: TransitionTable,
}

impl FlowController {
    /// Creates a controller.
    ///
    /// # Errors
    ///
    /// Returns an error if the start step or any rule endpoint names a step
    /// that is not registered.
    pub fn new(
        start: impl Into<String>,
        steps: HashMap<String, Arc<dyn Step>>,
        transitions: TransitionTable,
    ) -> Result<Self, JobValidationError> {
        let start = start.into();
        if !steps.contains_key(&start) {
            return Err(unknown_step(&start, "is the start step"));
        }
        for rule in transitions.rules() {
            if !steps.contains_key(&rule.from) {
                return Err(unknown_step(&rule.from, &format!("is the source of rule {rule}")));
            }
            if let TransitionTarget::Step(to) = &rule.to {
                if !steps.contains_key(to) {
                    return Err(unknown_step(to, &format!("is the target of rule {rule}")));
                }
            }
        }

        Ok(Self {
            start,
            steps,
            transitions,
        })
    }

    /// Returns the start step name.
    #[must_use]
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Returns the registered step names, sorted.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the transition rules.
    #[must_use]
    pub fn rules(&self) -> &[TransitionRule] {
        self.transitions.rules()
    }

    /// Runs the flow.
    pub async fn run(&self, ctx: &StepContext) -> FlowOutcome {
        let mut executions = Vec::new();
        let mut current = self.start.clone();

        loop {
            let Some(step) = self.steps.get(&current) else {
                // unreachable after validation in `new`
                warn!(step = %current, "Flow reached an unregistered step");
                return FlowOutcome {
                    status: BatchStatus::Failed,
                    exit_status: ExitStatus::Failed,
                    step_executions: executions,
                    end: FlowEnd::Implicit,
                };
            };

            let execution = step.execute(ctx).await;
            let exit_status = execution.exit_status.clone();
            let step_failed = exit_status.is_failed();
            executions.push(execution);

            match self.transitions.resolve(&current, &exit_status) {
                Some(TransitionTarget::End) => {
                    debug!(step = %current, exit_status = %exit_status, "Flow ended by rule");
                    return FlowOutcome {
                        status: BatchStatus::Completed,
                        exit_status: ExitStatus::Completed,
                        step_executions: executions,
                        end: FlowEnd::Explicit,
                    };
                }
                Some(TransitionTarget::Step(next)) => {
                    info!(from = %current, to = %next, exit_status = %exit_status, "Flow transition");
                    ctx.emit(
                        types::FLOW_TRANSITION,
                        json!({"from": current, "to": next, "exit_status": exit_status}),
                    )
                    .await;
                    current.clone_from(next);
                }
                None if step_failed => {
                    warn!(step = %current, exit_status = %exit_status, "Unhandled step failure ends flow");
                    return FlowOutcome {
                        status: BatchStatus::Failed,
                        exit_status: ExitStatus::Failed,
                        step_executions: executions,
                        end: FlowEnd::Implicit,
                    };
                }
                None => {
                    debug!(step = %current, exit_status = %exit_status, "Flow ended, no matching rule");
                    return FlowOutcome {
                        status: BatchStatus::Completed,
                        exit_status,
                        step_executions: executions,
                        end: FlowEnd::Implicit,
                    };
                }
            }
        }
    }
}

impl fmt::Debug for FlowController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowController")
            .field("start", &self.start)
            .field("steps", &self.step_names())
            .field("transitions", &self.transitions.len())
            .finish()
    }
}

fn unknown_step(name: &str, role: &str) -> JobValidationError {
    JobValidationError::new(
        "FLOW-UNKNOWN-STEP",
        format!("Step '{name}' {role} but is not registered"),
    )
    .with_steps(vec![name.to_string()])
    .with_fix_hint("Register the step with the job before referring to it.")
}
