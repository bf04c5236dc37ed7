//! Chunk buffering in front of a [`RecordSink`].

use crate::errors::{JobValidationError, WriteError};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// A destination accepting whole batches of processed items.
#[async_trait]
pub trait RecordSink<T>: Send + Sync {
    /// Writes one batch. A failed call must leave no partial effect the
    /// caller depends on; the same batch may be offered again.
    async fn write_batch(&self, items: &[T]) -> Result<(), WriteError>;
}

/// Buffers items and hands them to the sink `chunk_size` at a time.
///
/// The buffer is only cleared after the sink accepted the batch. On failure
/// the batch stays buffered so a later [`ChunkWriter::flush`] re-attempts
/// exactly the same items.
pub struct ChunkWriter<T> {
    sink: Arc<dyn RecordSink<T>>,
    chunk_size: usize,
    buffer: Vec<T>,
    batches_written: usize,
    items_written: usize,
}

impl<T> Debug for ChunkWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkWriter")
            .field("chunk_size", &self.chunk_size)
            .field("pending", &self.buffer.len())
            .field("batches_written", &self.batches_written)
            .field("items_written", &self.items_written)
            .finish()
    }
}

impl<T: Send + Sync> ChunkWriter<T> {
    /// Creates a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk_size` is zero.
    pub fn new(sink: Arc<dyn RecordSink<T>>, chunk_size: usize) -> Result<Self, JobValidationError> {
        if chunk_size == 0 {
            return Err(JobValidationError::new(
                "WRITER-ZERO-CHUNK",
                "Chunk size must be above zero",
            ));
        }
        Ok(Self {
            sink,
            chunk_size,
            buffer: Vec::with_capacity(chunk_size),
            batches_written: 0,
            items_written: 0,
        })
    }

    /// Appends an item, flushing when the buffer reaches the chunk size.
    ///
    /// Returns the size of the batch flushed by this call, if any. A batch
    /// left over from a failed flush is re-attempted first; if that still
    /// fails the item is not buffered.
    pub async fn write(&mut self, item: T) -> Result<Option<usize>, WriteError> {
        if self.buffer.len() >= self.chunk_size {
            self.flush().await?;
        }
        self.buffer.push(item);
        if self.buffer.len() >= self.chunk_size {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// Writes any buffered items as one batch. An empty buffer makes no sink
    /// call and returns 0.
    pub async fn flush(&mut self) -> Result<usize, WriteError> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        let size = self.buffer.len();
        self.sink.write_batch(&self.buffer).await?;

        self.buffer.clear();
        self.batches_written += 1;
        self.items_written += size;
        debug!(batch = self.batches_written, items = size, "Flushed chunk");
        Ok(size)
    }

    /// Drops buffered items and zeroes the counters, ready for a new run.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.batches_written = 0;
        self.items_written = 0;
    }

    /// Returns the number of buffered items.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the configured chunk size.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the number of batches the sink accepted.
    #[must_use]
    pub fn batches_written(&self) -> usize {
        self.batches_written
    }

    /// Returns the number of items the sink accepted.
    #[must_use]
    pub fn items_written(&self) -> usize {
        self.items_written
    }
}
