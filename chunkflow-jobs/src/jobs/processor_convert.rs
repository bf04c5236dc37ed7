//! Converts teachers with `id >= 5` to their names.

use super::teacher_reader;
use crate::teacher::Teacher;
use chunkflow::config::BatchConfig;
use chunkflow::errors::BatchError;
use chunkflow::item::processor::map;
use chunkflow::item::{ChunkWriter, ProcessingPipeline, RecordSink, RecordSource, RowFilter};
use chunkflow::job::{Job, JobBuilder};
use chunkflow::step::ChunkStep;
use std::sync::Arc;

/// Lowest teacher id the job reads.
pub const MIN_ID: i64 = 5;

/// Builds `ProcessorConvertBatch`. The job refuses to restart.
pub fn processor_convert_job(
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn RecordSink<String>>,
    config: &BatchConfig,
) -> Result<Job, BatchError> {
    let reader = teacher_reader(
        "processConvertReader",
        source,
        config,
        Some(RowFilter::ge("id", MIN_ID)),
    )?;
    let step = ChunkStep::builder("ProcessorConvertBatchStep")
        .reader(reader)
        .processor(ProcessingPipeline::of(map("getName", |t: Teacher| t.name)))
        .writer(ChunkWriter::new(sink, config.chunk_size)?)
        .build()?;

    Ok(JobBuilder::new("ProcessorConvertBatch")
        .prevent_restart()
        .start(Arc::new(step))?
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teacher::{seed_teachers, teacher_table};
    use chunkflow::core::JobParameters;
    use chunkflow::errors::JobRestartError;
    use chunkflow::item::CollectingSink;
    use chunkflow::job::{InMemoryJobRepository, JobLauncher};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_reads_from_id_five() {
        let sink = Arc::new(CollectingSink::<String>::new());
        let job = processor_convert_job(
            Arc::new(teacher_table(&seed_teachers())),
            sink.clone(),
            &BatchConfig::default(),
        )
        .unwrap();

        let execution = job.run(JobParameters::new()).await;

        assert!(execution.is_successful());
        let names = sink.items();
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], "Jung");
        let step = execution.step("ProcessorConvertBatchStep").unwrap();
        assert_eq!(step.read_count, 8);
    }

    #[tokio::test]
    async fn test_refuses_restart() {
        let repository = Arc::new(InMemoryJobRepository::new());
        let launcher = JobLauncher::new(repository);
        let job = processor_convert_job(
            Arc::new(teacher_table(&[])),
            Arc::new(CollectingSink::<String>::new()),
            &BatchConfig::default(),
        )
        .unwrap();
        assert!(!job.is_restartable());

        launcher.run(&job, JobParameters::new()).await.unwrap();
        let err = launcher.run(&job, JobParameters::new()).await.unwrap_err();
        assert!(matches!(
            err,
            BatchError::Restart(JobRestartError::AlreadyComplete { .. })
        ));
    }
}
