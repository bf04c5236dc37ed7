//! Job definitions.
//!
//! Each job is assembled from a record source, a sink and the batch
//! configuration, so the same definition runs against the demo table from
//! the command line and against collecting sinks in tests.

mod conditional;
mod processor_composite;
mod processor_convert;
mod processor_null;
mod simple;

pub use conditional::{conditional_job, FORCE_FAILURE_PARAM};
pub use processor_composite::{greet, processor_composite_job};
pub use processor_convert::processor_convert_job;
pub use processor_null::processor_null_job;
pub use simple::{simple_job, SimpleJobLayout};

use crate::teacher::Teacher;
use chunkflow::config::BatchConfig;
use chunkflow::errors::BatchError;
use chunkflow::item::{LoggingSink, PagedReader, RecordSource, RowFilter};
use clap::ValueEnum;
use std::sync::Arc;

/// The jobs this crate knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobKind {
    /// Tasklet steps that log the `requestDate` parameter.
    #[value(alias = "simpleJob")]
    Simple,
    /// Teachers with `id >= 5` converted to their names.
    #[value(alias = "ProcessorConvertBatch")]
    ProcessorConvert,
    /// Teachers with an even id filtered out.
    #[value(alias = "processorNullJob")]
    ProcessorNull,
    /// Names turned into greetings by a two-stage processor.
    #[value(alias = "processorCompositeJob")]
    ProcessorComposite,
    /// Three steps routed on the first step's exit status.
    #[value(alias = "stepNextConditionalJob")]
    Conditional,
}

/// Builds `kind` over `source`, writing items to the log.
pub fn build_job(
    kind: JobKind,
    source: Arc<dyn RecordSource>,
    config: &BatchConfig,
) -> Result<chunkflow::job::Job, BatchError> {
    match kind {
        JobKind::Simple => simple_job(SimpleJobLayout::default()),
        JobKind::ProcessorConvert => processor_convert_job(
            source,
            Arc::new(LoggingSink::<String>::display("Teacher Name")),
            config,
        ),
        JobKind::ProcessorNull => processor_null_job(
            source,
            Arc::new(LoggingSink::new("Teacher Name", |t: &Teacher| t.name.clone())),
            config,
        ),
        JobKind::ProcessorComposite => processor_composite_job(
            source,
            Arc::new(LoggingSink::<String>::display("Teacher Name")),
            config,
        ),
        JobKind::Conditional => conditional_job(),
    }
}

fn teacher_reader(
    name: &str,
    source: Arc<dyn RecordSource>,
    config: &BatchConfig,
    filter: Option<RowFilter>,
) -> Result<PagedReader<Teacher>, BatchError> {
    let mut builder = PagedReader::builder(name)
        .source(source)
        .sort_key("id")
        .page_size(config.page_size)
        .fetch_size(config.fetch_size);
    if let Some(filter) = filter {
        builder = builder.filter(filter);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teacher::{seed_teachers, teacher_table};

    #[tokio::test]
    async fn test_every_kind_builds_and_completes() {
        let source: Arc<dyn RecordSource> = Arc::new(teacher_table(&seed_teachers()));
        let config = BatchConfig::default();

        for kind in JobKind::value_variants() {
            let job = build_job(*kind, source.clone(), &config).unwrap();
            let execution = job.run(chunkflow::core::JobParameters::new()).await;
            assert!(execution.is_successful(), "{kind:?} did not complete");
        }
    }

    #[test]
    fn test_original_job_names_are_accepted() {
        assert_eq!(JobKind::from_str("simpleJob", false).unwrap(), JobKind::Simple);
        assert_eq!(
            JobKind::from_str("processor-composite", false).unwrap(),
            JobKind::ProcessorComposite
        );
    }
}
