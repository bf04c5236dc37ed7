//! Demo jobs for the chunkflow engine.
//!
//! A small `teacher` table and the jobs that read it, runnable from the
//! `chunkflow-jobs` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod jobs;
pub mod teacher;

pub use jobs::{build_job, JobKind};
pub use teacher::{seed_teachers, teacher_table, Teacher};
