//! Item-oriented building blocks.
//!
//! This module provides:
//! - Raw rows, sort keys and row filters
//! - The keyset-paginated reader over a record source
//! - Item processors and the processing pipeline
//! - The chunk writer in front of a record sink
//! - In-memory sources and sinks

mod memory;
pub mod processor;
mod reader;
mod row;
mod writer;

pub use memory::{CollectingSink, InMemoryRecordSource, LoggingSink};
pub use processor::{
    CompositeProcessor, FnProcessor, ItemProcessor, ProcessResult, ProcessingPipeline,
};
pub use reader::{
    Page, PageRequest, PagedReader, PagedReaderBuilder, RecordSource, DEFAULT_PAGE_SIZE,
};
pub use row::{CompareOp, FromRow, Row, RowFilter, SortKey};
pub use writer::{ChunkWriter, RecordSink};
