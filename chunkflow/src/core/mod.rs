//! Core domain model types for chunkflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Exit, batch and repeat status enums
//! - Job parameters and instance identity

mod parameters;
mod status;

pub use parameters::{JobParameter, JobParameters};
pub use status::{BatchStatus, ExitStatus, RepeatStatus};
