//! In-memory record sources and sinks.

use super::reader::{PageRequest, RecordSource};
use super::row::Row;
use super::writer::RecordSink;
use crate::errors::{ReadError, WriteError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// A record source over rows held in memory.
///
/// Rows may be stored in any order; each fetch sorts the eligible rows by
/// the requested key.
#[derive(Debug, Default)]
pub struct InMemoryRecordSource {
    name: String,
    rows: RwLock<Vec<Row>>,
    fetches: AtomicUsize,
}

impl InMemoryRecordSource {
    /// Creates a source over the given rows.
    #[must_use]
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(rows),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Adds a row.
    pub fn insert(&self, row: Row) {
        self.rows.write().push(row);
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Returns how many times [`RecordSource::fetch_page`] was called.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Vec<Row>, ReadError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read();

        let mut eligible = Vec::new();
        for row in rows.iter() {
            if request.filter.is_some_and(|f| !f.matches(row)) {
                continue;
            }
            let key = row
                .sort_key(request.sort_key)
                .ok_or_else(|| ReadError::missing_sort_key(&self.name, request.sort_key))?;
            if request.after.is_some_and(|after| key <= *after) {
                continue;
            }
            eligible.push((key, row));
        }

        eligible.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(eligible
            .into_iter()
            .take(request.limit)
            .map(|(_, row)| row.clone())
            .collect())
    }
}

/// A sink that keeps every accepted batch.
#[derive(Debug)]
pub struct CollectingSink<T> {
    batches: Mutex<Vec<Vec<T>>>,
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> CollectingSink<T> {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the batches in the order they were written.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<T>> {
        self.batches.lock().clone()
    }

    /// Returns all written items, flattened.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.batches.lock().iter().flatten().cloned().collect()
    }

    /// Returns the number of batches written.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// Forgets everything written so far.
    pub fn clear(&self) {
        self.batches.lock().clear();
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> RecordSink<T> for CollectingSink<T> {
    async fn write_batch(&self, items: &[T]) -> Result<(), WriteError> {
        self.batches.lock().push(items.to_vec());
        Ok(())
    }
}

/// A sink that logs every item through `tracing`.
pub struct LoggingSink<T> {
    label: String,
    render: Box<dyn Fn(&T) -> String + Send + Sync>,
}

impl<T> LoggingSink<T> {
    /// Creates a sink rendering items with `render`.
    #[must_use]
    pub fn new(label: impl Into<String>, render: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            render: Box::new(render),
        }
    }
}

impl<T: Display + 'static> LoggingSink<T> {
    /// Creates a sink logging each item with its `Display` form.
    #[must_use]
    pub fn display(label: impl Into<String>) -> Self {
        Self::new(label, ToString::to_string)
    }
}

impl<T> Debug for LoggingSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingSink")
            .field("label", &self.label)
            .finish()
    }
}

#[async_trait]
impl<T: Send + Sync> RecordSink<T> for LoggingSink<T> {
    async fn write_batch(&self, items: &[T]) -> Result<(), WriteError> {
        for item in items {
            info!("{} = {}", self.label, (self.render)(item));
        }
        Ok(())
    }
}
