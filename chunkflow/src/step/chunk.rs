//! Chunk-oriented steps: read, process and write until the source runs dry.

use super::context::StepContext;
use super::execution::StepExecution;
use super::{ExitStatusListener, Step};
use crate::errors::{BatchError, JobValidationError};
use crate::events::types;
use crate::item::{ChunkWriter, FromRow, PagedReader, ProcessingPipeline};
use async_trait::async_trait;
use serde_json::json;
use std::fmt::{self, Debug};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A step driving one reader, one processing pipeline and one writer.
///
/// Every execution rewinds the reader and empties the writer first, so a
/// step can be run again (for example by a re-launched job).
pub struct ChunkStep<I, O> {
    name: String,
    reader: Mutex<PagedReader<I>>,
    pipeline: ProcessingPipeline<I, O>,
    writer: Mutex<ChunkWriter<O>>,
    listener: Option<Box<dyn ExitStatusListener>>,
}

impl<I, O> Debug for ChunkStep<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkStep")
            .field("name", &self.name)
            .field("pipeline", &self.pipeline)
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl<I, O> ChunkStep<I, O>
where
    I: FromRow + Send + 'static,
    O: Send + Sync + 'static,
{
    /// Starts building a chunk step.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ChunkStepBuilder<I, O> {
        ChunkStepBuilder::new(name)
    }

    async fn run_chunks(
        &self,
        ctx: &StepContext,
        reader: &mut PagedReader<I>,
        writer: &mut ChunkWriter<O>,
        execution: &mut StepExecution,
    ) -> Result<(), BatchError> {
        loop {
            let page = reader.next_page().await?;
            if page.is_empty() {
                let flushed = writer.flush().await?;
                if flushed > 0 {
                    self.chunk_written(ctx, writer, flushed).await;
                }
                return Ok(());
            }

            execution.read_count += page.len();
            for record in page.into_records() {
                match self.pipeline.process(record)? {
                    Some(item) => {
                        if let Some(flushed) = writer.write(item).await? {
                            self.chunk_written(ctx, writer, flushed).await;
                        }
                    }
                    None => execution.filter_count += 1,
                }
            }
        }
    }

    async fn chunk_written(&self, ctx: &StepContext, writer: &ChunkWriter<O>, items: usize) {
        debug!(step = %self.name, chunk = writer.batches_written(), items, "Chunk written");
        ctx.emit(
            types::CHUNK_WRITTEN,
            json!({
                "step": self.name,
                "chunk": writer.batches_written(),
                "items": items,
            }),
        )
        .await;
    }
}

#[async_trait]
impl<I, O> Step for ChunkStep<I, O>
where
    I: FromRow + Send + 'static,
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &StepContext) -> StepExecution {
        let mut execution = StepExecution::start(&self.name);
        info!(step = %self.name, "Step started");
        ctx.emit(types::STEP_STARTED, json!({"step": self.name})).await;

        let mut reader = self.reader.lock().await;
        let mut writer = self.writer.lock().await;
        reader.reset();
        writer.reset();

        let outcome = self
            .run_chunks(ctx, &mut reader, &mut writer, &mut execution)
            .await;

        execution.write_count = writer.items_written();
        execution.commit_count = writer.batches_written();
        match outcome {
            Ok(()) => execution.complete(),
            Err(error) => {
                warn!(step = %self.name, error = %error, "Step failed");
                execution.fail(&error);
            }
        }
        if let Some(status) = self.listener.as_ref().and_then(|l| l.after_step(&execution)) {
            execution.override_exit_status(status);
        }

        super::report_finished(ctx, &execution).await;
        execution
    }
}

/// Builder for [`ChunkStep`].
pub struct ChunkStepBuilder<I, O> {
    name: String,
    reader: Option<PagedReader<I>>,
    pipeline: Option<ProcessingPipeline<I, O>>,
    writer: Option<ChunkWriter<O>>,
    listener: Option<Box<dyn ExitStatusListener>>,
}

impl<I, O> ChunkStepBuilder<I, O>
where
    I: FromRow + Send + 'static,
    O: Send + Sync + 'static,
{
    /// Creates a builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reader: None,
            pipeline: None,
            writer: None,
            listener: None,
        }
    }

    /// Sets the reader.
    #[must_use]
    pub fn reader(mut self, reader: PagedReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Sets the processing pipeline. Use [`ProcessingPipeline::new`] for a
    /// pass-through step.
    #[must_use]
    pub fn processor(mut self, pipeline: ProcessingPipeline<I, O>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Sets the writer.
    #[must_use]
    pub fn writer(mut self, writer: ChunkWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Sets a listener that may replace the step's exit status.
    #[must_use]
    pub fn exit_status_listener(mut self, listener: impl ExitStatusListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Builds the step.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader, processor or writer is missing.
    pub fn build(self) -> Result<ChunkStep<I, O>, JobValidationError> {
        let missing = |part: &str| {
            JobValidationError::new(
                "STEP-MISSING-COMPONENT",
                format!("Chunk step '{}' has no {part}", self.name),
            )
            .with_steps(vec![self.name.clone()])
        };
        let reader = self.reader.ok_or_else(|| missing("reader"))?;
        let pipeline = self.pipeline.ok_or_else(|| missing("processor"))?;
        let writer = self.writer.ok_or_else(|| missing("writer"))?;

        Ok(ChunkStep {
            name: self.name,
            reader: Mutex::new(reader),
            pipeline,
            writer: Mutex::new(writer),
            listener: self.listener,
        })
    }
}

impl<I, O> Debug for ChunkStepBuilder<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkStepBuilder")
            .field("name", &self.name)
            .field("has_reader", &self.reader.is_some())
            .field("has_processor", &self.pipeline.is_some())
            .field("has_writer", &self.writer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BatchStatus, ExitStatus, JobParameters};
    use crate::events::CollectingEventSink;
    use crate::item::{processor, CollectingSink, InMemoryRecordSource, RecordSink, RecordSource};
    use crate::testing::{numbered_rows, FailingSink, FailingSource, TestRecord};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn reader(source: Arc<dyn RecordSource>, page_size: usize) -> PagedReader<TestRecord> {
        PagedReader::builder("reader")
            .source(source)
            .page_size(page_size)
            .build()
            .unwrap()
    }

    fn ids_step(
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn RecordSink<i64>>,
        page_size: usize,
        chunk_size: usize,
    ) -> ChunkStep<TestRecord, i64> {
        ChunkStep::builder("ids")
            .reader(reader(source, page_size))
            .processor(ProcessingPipeline::of(processor::map("id", |r: TestRecord| r.id)))
            .writer(ChunkWriter::new(sink, chunk_size).unwrap())
            .build()
            .unwrap()
    }

    fn ctx() -> StepContext {
        StepContext::new("test-job", JobParameters::new())
    }

    #[tokio::test]
    async fn test_drop_even_ids() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=5)));
        let sink = Arc::new(CollectingSink::<i64>::new());
        let step = ChunkStep::builder("odd")
            .reader(reader(source, 10))
            .processor(
                ProcessingPipeline::new()
                    .then(processor::map("id", |r: TestRecord| r.id))
                    .then(processor::filter("drop-even", |id: &i64| id % 2 != 0)),
            )
            .writer(ChunkWriter::<i64>::new(sink.clone(), 10).unwrap())
            .build()
            .unwrap();

        let execution = step.execute(&ctx()).await;

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(execution.read_count, 5);
        assert_eq!(execution.filter_count, 2);
        assert_eq!(execution.write_count, 3);
        assert_eq!(execution.commit_count, 1);
        assert_eq!(sink.batches(), vec![vec![1, 3, 5]]);
    }

    #[tokio::test]
    async fn test_chunks_cross_page_boundaries() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=23)));
        let sink = Arc::new(CollectingSink::<i64>::new());
        let step = ids_step(source, sink.clone(), 4, 10);

        let execution = step.execute(&ctx()).await;

        let sizes: Vec<usize> = sink.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(execution.read_count, 23);
        assert_eq!(execution.commit_count, 3);
        assert_eq!(sink.items(), (1..=23).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_read_failure_fails_step() {
        let source = Arc::new(FailingSource::after_pages(numbered_rows(1..=30), 1));
        let sink = Arc::new(CollectingSink::<i64>::new());
        let step = ids_step(source, sink.clone(), 10, 5);

        let execution = step.execute(&ctx()).await;

        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(execution.exit_status, ExitStatus::Failed);
        assert_eq!(execution.failure.as_ref().unwrap().kind, "read");
        // chunks flushed before the failure stay written
        assert_eq!(execution.write_count, 10);
        assert_eq!(sink.batch_count(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_fails_step() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=4)));
        let sink = Arc::new(FailingSink::<i64>::failing_first(1));
        let step = ids_step(source, sink.clone(), 10, 2);

        let execution = step.execute(&ctx()).await;

        assert!(execution.is_failed());
        assert_eq!(execution.failure.as_ref().unwrap().kind, "write");
        assert!(sink.accepted().is_empty());
    }

    #[tokio::test]
    async fn test_process_failure_fails_step() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=3)));
        let sink = Arc::new(CollectingSink::<i64>::new());
        let step = ChunkStep::builder("explode")
            .reader(reader(source, 10))
            .processor(ProcessingPipeline::of(processor::FnProcessor::new(
                "reject-two",
                |r: TestRecord| {
                    if r.id == 2 {
                        Err(crate::errors::ProcessError::new("two is not allowed"))
                    } else {
                        Ok(Some(r.id))
                    }
                },
            )))
            .writer(ChunkWriter::<i64>::new(sink.clone(), 10).unwrap())
            .build()
            .unwrap();

        let execution = step.execute(&ctx()).await;

        let failure = execution.failure.unwrap();
        assert_eq!(failure.kind, "process");
        assert!(failure.message.contains("reject-two"));
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn test_rerun_reads_from_start() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=3)));
        let sink = Arc::new(CollectingSink::<i64>::new());
        let step = ids_step(source, sink.clone(), 10, 10);

        let first = step.execute(&ctx()).await;
        let second = step.execute(&ctx()).await;

        assert_eq!(first.read_count, second.read_count);
        assert_eq!(sink.batches(), vec![vec![1, 2, 3], vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_listener_overrides_exit_status() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=3)));
        let sink = Arc::new(CollectingSink::<i64>::new());
        let step = ChunkStep::builder("ids")
            .reader(reader(source, 10))
            .processor(ProcessingPipeline::of(processor::map("id", |r: TestRecord| r.id)))
            .writer(ChunkWriter::<i64>::new(sink, 10).unwrap())
            .exit_status_listener(|execution: &StepExecution| {
                (execution.write_count < 5).then(|| ExitStatus::custom("TOO FEW"))
            })
            .build()
            .unwrap();

        let execution = step.execute(&ctx()).await;
        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(execution.exit_status, ExitStatus::custom("TOO FEW"));
    }

    #[tokio::test]
    async fn test_emits_lifecycle_events() {
        let events = Arc::new(CollectingEventSink::new());
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=5)));
        let sink = Arc::new(CollectingSink::<i64>::new());
        let step = ids_step(source, sink, 10, 2);

        step.execute(&ctx().with_event_sink(events.clone())).await;

        assert_eq!(
            events.types(),
            vec![
                "step.started",
                "chunk.written",
                "chunk.written",
                "chunk.written",
                "step.completed"
            ]
        );
    }

    #[test]
    fn test_builder_requires_components() {
        let err = ChunkStep::<TestRecord, TestRecord>::builder("empty")
            .build()
            .unwrap_err();
        assert_eq!(err.code, "STEP-MISSING-COMPONENT");
        assert!(err.message.contains("reader"));
    }
}
