//! The simple tasklet job.

use chunkflow::core::RepeatStatus;
use chunkflow::errors::BatchError;
use chunkflow::job::{Job, JobBuilder};
use chunkflow::step::{Step, StepContribution, TaskletStep};
use std::sync::Arc;
use tracing::info;

/// Which version of the simple job to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimpleJobLayout {
    /// Only `simpleStep1`.
    OneStep,
    /// `simpleStep1` followed by `simpleStep2`.
    #[default]
    TwoSteps,
}

fn log_step(label: &'static str) -> impl Fn(&mut StepContribution) -> Result<RepeatStatus, BatchError> {
    move |contribution: &mut StepContribution| {
        let request_date = contribution
            .parameters()
            .get("requestDate")
            .map_or_else(|| "null".to_string(), ToString::to_string);
        info!(">>>>> This is {label}");
        info!(">>>>> requestDate = {request_date}");
        Ok(RepeatStatus::Finished)
    }
}

/// Builds `simpleJob`.
pub fn simple_job(layout: SimpleJobLayout) -> Result<Job, BatchError> {
    let step1: Arc<dyn Step> = Arc::new(TaskletStep::from_fn("simpleStep1", log_step("Step1")));
    let mut builder = JobBuilder::new("simpleJob").start(step1)?;
    if layout == SimpleJobLayout::TwoSteps {
        let step2: Arc<dyn Step> = Arc::new(TaskletStep::from_fn("simpleStep2", log_step("Step2")));
        builder = builder.next(step2)?;
    }
    Ok(builder.build()?)
}
