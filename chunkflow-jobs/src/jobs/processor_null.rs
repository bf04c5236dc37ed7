//! Filters out teachers with an even id.

use super::teacher_reader;
use crate::teacher::Teacher;
use chunkflow::config::BatchConfig;
use chunkflow::errors::BatchError;
use chunkflow::item::{
    ChunkWriter, FnProcessor, ProcessResult, ProcessingPipeline, RecordSink, RecordSource,
};
use chunkflow::job::{Job, JobBuilder};
use chunkflow::step::ChunkStep;
use std::sync::Arc;
use tracing::info;

/// Builds `processorNullJob`.
pub fn processor_null_job(
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn RecordSink<Teacher>>,
    config: &BatchConfig,
) -> Result<Job, BatchError> {
    let reader = teacher_reader("processorNullReader", source, config, None)?;
    let drop_even = FnProcessor::new("ignoreEvenIds", |teacher: Teacher| -> ProcessResult<Teacher> {
        if teacher.id % 2 == 0 {
            info!(">>>>>>>>> Teacher Name = {}, isIgnoreTest = true", teacher.name);
            return Ok(None);
        }
        Ok(Some(teacher))
    });
    let step = ChunkStep::builder("processorNullStep")
        .reader(reader)
        .processor(ProcessingPipeline::of(drop_even))
        .writer(ChunkWriter::new(sink, config.chunk_size)?)
        .build()?;

    Ok(JobBuilder::new("processorNullJob")
        .start(Arc::new(step))?
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teacher::teacher_table;
    use chunkflow::core::JobParameters;
    use chunkflow::item::CollectingSink;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_five_teachers_write_three() {
        let teachers: Vec<Teacher> = (1..=5).map(|id| Teacher::new(id, format!("t{id}"))).collect();
        let sink = Arc::new(CollectingSink::<Teacher>::new());
        let job = processor_null_job(
            Arc::new(teacher_table(&teachers)),
            sink.clone(),
            &BatchConfig::default(),
        )
        .unwrap();

        let execution = job.run(JobParameters::new()).await;

        let step = execution.step("processorNullStep").unwrap();
        assert_eq!(step.read_count, 5);
        assert_eq!(step.filter_count, 2);
        assert_eq!(step.write_count, 3);
        // one partial chunk of 3 ends the loop
        assert_eq!(step.commit_count, 1);
        let ids: Vec<i64> = sink.items().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
