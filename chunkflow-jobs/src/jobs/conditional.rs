//! Three tasklet steps routed on the first step's exit status.
//!
//! ```text
//! step1 --FAILED--> step3 --*--> END
//! step1 --*-------> step2 --COMPLETED--> step3
//! ```

use chunkflow::core::{ExitStatus, RepeatStatus};
use chunkflow::errors::BatchError;
use chunkflow::flow::TransitionTarget;
use chunkflow::job::{Job, JobBuilder};
use chunkflow::step::{Step, StepContribution, TaskletStep};
use std::sync::Arc;
use tracing::info;

/// Boolean job parameter that makes step 1 exit with `FAILED`.
pub const FORCE_FAILURE_PARAM: &str = "forceFailure";

const STEP1: &str = "conditionalJobStep1";
const STEP2: &str = "conditionalJobStep2";
const STEP3: &str = "conditionalJobStep3";

fn announce(label: &'static str) -> impl Fn(&mut StepContribution) -> Result<RepeatStatus, BatchError> {
    move |_contribution: &mut StepContribution| {
        info!(">>>>> This is stepNextConditionalJob {label}");
        Ok(RepeatStatus::Finished)
    }
}

/// Builds `stepNextConditionalJob`.
pub fn conditional_job() -> Result<Job, BatchError> {
    let step1: Arc<dyn Step> = Arc::new(TaskletStep::from_fn(STEP1, |contribution: &mut StepContribution| {
        info!(">>>>> This is stepNextConditionalJob Step1");
        if contribution.parameters().get_bool(FORCE_FAILURE_PARAM) == Some(true) {
            contribution.set_exit_status(ExitStatus::Failed);
        }
        Ok(RepeatStatus::Finished)
    }));
    let step2: Arc<dyn Step> = Arc::new(TaskletStep::from_fn(STEP2, announce("Step2")));
    let step3: Arc<dyn Step> = Arc::new(TaskletStep::from_fn(STEP3, announce("Step3")));

    Ok(JobBuilder::new("stepNextConditionalJob")
        .start(step1)?
        .step(step2)?
        .step(step3)?
        .on(STEP1, ExitStatus::Failed, TransitionTarget::step(STEP3))?
        .on(STEP3, "*", TransitionTarget::End)?
        .on(STEP1, "*", TransitionTarget::step(STEP2))?
        .on(STEP2, ExitStatus::Completed, TransitionTarget::step(STEP3))?
        .build()?)
}
