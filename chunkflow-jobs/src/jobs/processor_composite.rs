//! Turns teachers into greetings with a two-stage processor.

use super::teacher_reader;
use crate::teacher::Teacher;
use chunkflow::config::BatchConfig;
use chunkflow::errors::BatchError;
use chunkflow::item::processor::map;
use chunkflow::item::{ChunkWriter, ProcessingPipeline, RecordSink, RecordSource};
use chunkflow::job::{Job, JobBuilder};
use chunkflow::step::ChunkStep;
use std::sync::Arc;

/// Renders the greeting for `name`.
#[must_use]
pub fn greet(name: &str) -> String {
    format!("안녕하세요. {name}입니다.")
}

/// Builds `processorCompositeJob`.
pub fn processor_composite_job(
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn RecordSink<String>>,
    config: &BatchConfig,
) -> Result<Job, BatchError> {
    let reader = teacher_reader("processCompositeReader", source, config, None)?;
    let pipeline = ProcessingPipeline::new()
        .then(map("getName", |t: Teacher| t.name))
        .then(map("greet", |name: String| greet(&name)));
    let step = ChunkStep::builder("processorCompositeStep")
        .reader(reader)
        .processor(pipeline)
        .writer(ChunkWriter::new(sink, config.chunk_size)?)
        .build()?;

    Ok(JobBuilder::new("processorCompositeJob")
        .start(Arc::new(step))?
        .build()?)
}
