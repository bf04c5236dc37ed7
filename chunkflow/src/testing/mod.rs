//! Testing utilities for chunkflow jobs.
//!
//! This module provides:
//! - Failing sources and sinks for error-path tests
//! - Recording tasklets and fixed-outcome steps
//! - Row fixtures and assertions on executions

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_exit_status, assert_job_completed, assert_job_failed, assert_step_sequence,
};
pub use fixtures::{numbered_rows, TestRecord};
pub use mocks::{FailingSink, FailingSource, RecordingTasklet, StaticStep};
