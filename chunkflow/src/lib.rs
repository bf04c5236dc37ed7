//! # Chunkflow
//!
//! A chunk-oriented batch pipeline engine.
//!
//! A job is a flow of steps. A chunk step pulls pages of records from a
//! [`RecordSource`](item::RecordSource) with keyset pagination, passes each
//! record through a typed processing pipeline (where `None` filters the
//! item out) and hands the survivors to a sink in fixed-size chunks. Steps
//! finish with an exit status, and the flow picks the next step from a
//! transition table:
//!
//! - **Keyset pagination**: pages never overlap or skip, resuming after the
//!   last key read
//! - **Typed pipelines**: stages may change the item type along the chain
//! - **All-or-nothing chunks**: a rejected batch stays buffered for retry
//! - **Conditional flows**: exact exit-status rules beat `*`
//! - **Restart policy**: completed instances never run twice
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chunkflow::prelude::*;
//!
//! let reader = PagedReader::<Teacher>::builder("teachers")
//!     .source(source)
//!     .filter(RowFilter::ge("id", 5))
//!     .build()?;
//! let step = ChunkStep::builder("convert")
//!     .reader(reader)
//!     .processor(ProcessingPipeline::new().then(map("name", |t: Teacher| t.name)))
//!     .writer(ChunkWriter::new(sink, 10)?)
//!     .build()?;
//! let job = JobBuilder::new("convertJob").start(Arc::new(step))?.build()?;
//!
//! let execution = JobLauncher::new(Arc::new(InMemoryJobRepository::new()))
//!     .run(&job, JobParameters::new())
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod flow;
pub mod item;
pub mod job;
pub mod step;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BatchConfig, LogFormat};
    pub use crate::core::{BatchStatus, ExitStatus, JobParameter, JobParameters, RepeatStatus};
    pub use crate::errors::{
        BatchError, JobRestartError, JobValidationError, ProcessError, ReadError, WriteError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::flow::{FlowController, StatusPattern, TransitionTarget};
    pub use crate::item::processor::{filter, map};
    pub use crate::item::{
        ChunkWriter, CollectingSink, CompositeProcessor, FnProcessor, FromRow,
        InMemoryRecordSource, ItemProcessor, LoggingSink, PagedReader, ProcessingPipeline,
        RecordSink, RecordSource, Row, RowFilter, SortKey,
    };
    pub use crate::job::{
        InMemoryJobRepository, Job, JobBuilder, JobExecution, JobLauncher, JobRepository,
    };
    pub use crate::step::{
        ChunkStep, ExitStatusListener, Step, StepContext, StepContribution, StepExecution,
        Tasklet, TaskletStep,
    };
}
