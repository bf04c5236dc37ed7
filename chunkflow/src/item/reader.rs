//! Keyset-paginated reading of records from a [`RecordSource`].

use super::row::{FromRow, Row, RowFilter, SortKey};
use crate::errors::{JobValidationError, ReadError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default page size used by readers and chunk writers.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One request against a record source.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Column the source must order by, ascending.
    pub sort_key: &'a str,
    /// Resume strictly after this key; `None` starts from the beginning.
    pub after: Option<&'a SortKey>,
    /// Maximum number of rows to return.
    pub limit: usize,
    /// Optional restriction on eligible rows.
    pub filter: Option<&'a RowFilter>,
}

/// A paginated backing store.
///
/// Implementations must return rows ordered ascending by `sort_key`,
/// starting strictly after `after`, with at most `limit` rows, and only
/// rows accepted by `filter`.
#[async_trait]
pub trait RecordSource: Send + Sync + Debug {
    /// Returns the source name used in diagnostics.
    fn name(&self) -> &str;

    /// Fetches one batch of raw rows.
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Vec<Row>, ReadError>;
}

/// An ordered slice of records plus the cursor to continue from.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    /// Records in ascending key order.
    pub records: Vec<R>,
    /// Key of the last record read so far.
    pub last_key: Option<SortKey>,
    /// The logical page size the reader was configured with.
    pub page_size: usize,
}

impl<R> Page<R> {
    /// Returns true when the reader is exhausted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Consumes the page into its records.
    #[must_use]
    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

/// Reads typed records page by page, tracking the last key seen.
///
/// `fetch_size` bounds each call to the source while `page_size` bounds the
/// logical page; a page may take several fetches when `fetch_size` is
/// smaller.
pub struct PagedReader<R> {
    name: String,
    source: Arc<dyn RecordSource>,
    sort_key: String,
    filter: Option<RowFilter>,
    page_size: usize,
    fetch_size: usize,
    last_key: Option<SortKey>,
    drained: bool,
    pages_read: usize,
    buffer: VecDeque<R>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Debug for PagedReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedReader")
            .field("name", &self.name)
            .field("source", &self.source.name())
            .field("sort_key", &self.sort_key)
            .field("page_size", &self.page_size)
            .field("fetch_size", &self.fetch_size)
            .field("last_key", &self.last_key)
            .finish()
    }
}

impl<R: FromRow> PagedReader<R> {
    /// Starts building a reader.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PagedReaderBuilder<R> {
        PagedReaderBuilder::new(name)
    }

    /// Returns the reader name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key of the last record read.
    #[must_use]
    pub fn last_key(&self) -> Option<&SortKey> {
        self.last_key.as_ref()
    }

    /// Returns the number of non-empty pages read since the last reset.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages_read
    }

    /// Returns the logical page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the per-fetch row limit.
    #[must_use]
    pub fn fetch_size(&self) -> usize {
        self.fetch_size
    }

    /// Rewinds the cursor so the next page starts from the beginning.
    pub fn reset(&mut self) {
        self.last_key = None;
        self.drained = false;
        self.pages_read = 0;
        self.buffer.clear();
    }

    /// Reads the next page. An empty page means the source is exhausted.
    ///
    /// The cursor only advances once the whole page has been read. If a
    /// fetch or a row fails partway, the records already collected for the
    /// page are discarded, the cursor stays at the last record delivered and
    /// the next call fetches them again.
    pub async fn next_page(&mut self) -> Result<Page<R>, ReadError> {
        let mut records = Vec::with_capacity(self.page_size);
        let mut cursor = self.last_key.clone();
        let mut drained = self.drained;

        while !drained && records.len() < self.page_size {
            let limit = self.fetch_size.min(self.page_size - records.len());
            let rows = self
                .source
                .fetch_page(PageRequest {
                    sort_key: &self.sort_key,
                    after: cursor.as_ref(),
                    limit,
                    filter: self.filter.as_ref(),
                })
                .await
                .map_err(|e| e.with_last_key(self.last_key.clone()))?;

            trace!(reader = %self.name, requested = limit, received = rows.len(), "Fetched rows");

            if rows.len() > limit {
                return Err(self.error(format!(
                    "source returned {} rows for a limit of {limit}",
                    rows.len()
                )));
            }
            if rows.len() < limit {
                drained = true;
            }

            for row in &rows {
                let key = row.sort_key(&self.sort_key).ok_or_else(|| {
                    ReadError::missing_sort_key(&self.name, &self.sort_key)
                        .with_last_key(self.last_key.clone())
                })?;
                if cursor.as_ref().is_some_and(|last| key <= *last) {
                    return Err(self.error(format!(
                        "source returned key {key} out of order"
                    )));
                }
                let record = R::from_row(row).map_err(|e| ReadError {
                    reader: self.name.clone(),
                    last_key: self.last_key.clone(),
                    ..e
                })?;
                records.push(record);
                cursor = Some(key);
            }
        }

        self.last_key = cursor;
        self.drained = drained;

        if !records.is_empty() {
            self.pages_read += 1;
            debug!(
                reader = %self.name,
                page = self.pages_read,
                records = records.len(),
                last_key = ?self.last_key,
                "Read page"
            );
        }

        Ok(Page {
            records,
            last_key: self.last_key.clone(),
            page_size: self.page_size,
        })
    }

    /// Reads a single record, pulling a new page when the buffer runs dry.
    /// Returns `None` once the source is exhausted.
    pub async fn read(&mut self) -> Result<Option<R>, ReadError> {
        if self.buffer.is_empty() {
            let page = self.next_page().await?;
            self.buffer.extend(page.into_records());
        }
        Ok(self.buffer.pop_front())
    }

    fn error(&self, message: String) -> ReadError {
        ReadError::new(&self.name, message).with_last_key(self.last_key.clone())
    }
}

/// Builder for [`PagedReader`].
pub struct PagedReaderBuilder<R> {
    name: String,
    source: Option<Arc<dyn RecordSource>>,
    sort_key: String,
    filter: Option<RowFilter>,
    page_size: usize,
    fetch_size: Option<usize>,
    _record: PhantomData<fn() -> R>,
}

impl<R: FromRow> PagedReaderBuilder<R> {
    /// Creates a builder sorting by `id` with the default page size.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            sort_key: "id".to_string(),
            filter: None,
            page_size: DEFAULT_PAGE_SIZE,
            fetch_size: None,
            _record: PhantomData,
        }
    }

    /// Sets the record source.
    #[must_use]
    pub fn source(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the unique column to order and paginate by.
    #[must_use]
    pub fn sort_key(mut self, column: impl Into<String>) -> Self {
        self.sort_key = column.into();
        self
    }

    /// Restricts the rows the reader sees.
    #[must_use]
    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the logical page size.
    #[must_use]
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the per-fetch row limit. Defaults to the page size.
    #[must_use]
    pub fn fetch_size(mut self, size: usize) -> Self {
        self.fetch_size = Some(size);
        self
    }

    /// Builds the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if no source was given or a size is zero.
    pub fn build(self) -> Result<PagedReader<R>, JobValidationError> {
        let source = self.source.ok_or_else(|| {
            JobValidationError::new("READER-NO-SOURCE", format!("Reader '{}' has no source", self.name))
                .with_fix_hint("Call .source(...) before building the reader.")
        })?;
        let fetch_size = self.fetch_size.unwrap_or(self.page_size);
        if self.page_size == 0 || fetch_size == 0 {
            return Err(JobValidationError::new(
                "READER-ZERO-SIZE",
                format!("Reader '{}' needs page and fetch sizes above zero", self.name),
            ));
        }
        if self.sort_key.trim().is_empty() {
            return Err(JobValidationError::new(
                "READER-NO-SORT-KEY",
                format!("Reader '{}' has an empty sort key", self.name),
            ));
        }

        Ok(PagedReader {
            name: self.name,
            source,
            sort_key: self.sort_key,
            filter: self.filter,
            page_size: self.page_size,
            fetch_size,
            last_key: None,
            drained: false,
            pages_read: 0,
            buffer: VecDeque::new(),
            _record: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::InMemoryRecordSource;
    use crate::testing::{numbered_rows, FailingSource, TestRecord};
    use pretty_assertions::assert_eq;

    fn reader(source: Arc<dyn RecordSource>, page_size: usize) -> PagedReader<TestRecord> {
        PagedReader::builder("test-reader")
            .source(source)
            .page_size(page_size)
            .build()
            .unwrap()
    }

    async fn drain(reader: &mut PagedReader<TestRecord>) -> Vec<Vec<i64>> {
        let mut pages = Vec::new();
        loop {
            let page = reader.next_page().await.unwrap();
            if page.is_empty() {
                break;
            }
            pages.push(page.records.iter().map(|r| r.id).collect());
        }
        pages
    }

    #[tokio::test]
    async fn test_pages_never_overlap_or_skip() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=23)));
        let mut reader = reader(source, 10);

        let pages = drain(&mut reader).await;
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], (21..=23).collect::<Vec<_>>());

        let all: Vec<i64> = pages.into_iter().flatten().collect();
        assert_eq!(all, (1..=23).collect::<Vec<_>>());
        assert_eq!(reader.page_count(), 3);
        assert_eq!(reader.last_key(), Some(&SortKey::Int(23)));
    }

    #[tokio::test]
    async fn test_unsorted_source_still_pages_in_order() {
        let rows = numbered_rows([9, 3, 7, 1, 5]);
        let source = Arc::new(InMemoryRecordSource::new("teachers", rows));
        let mut reader = reader(source, 2);

        assert_eq!(drain(&mut reader).await, vec![vec![1, 3], vec![5, 7], vec![9]]);
    }

    #[tokio::test]
    async fn test_filter_starts_at_smallest_matching_key() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=12)));
        let mut reader: PagedReader<TestRecord> = PagedReader::builder("filtered")
            .source(source)
            .filter(RowFilter::ge("id", 5))
            .page_size(10)
            .build()
            .unwrap();

        let first = reader.next_page().await.unwrap();
        assert_eq!(first.records.first().map(|r| r.id), Some(5));
        assert_eq!(first.len(), 8);
        assert!(reader.next_page().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_size_smaller_than_page_size() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=7)));
        let mut reader: PagedReader<TestRecord> = PagedReader::builder("small-fetch")
            .source(source.clone())
            .page_size(5)
            .fetch_size(2)
            .build()
            .unwrap();

        let first = reader.next_page().await.unwrap();
        assert_eq!(first.len(), 5);
        // 2 + 2 + 1 rows to fill the first page
        assert_eq!(source.fetch_count(), 3);

        let second = reader.next_page().await.unwrap();
        assert_eq!(second.records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![6, 7]);
        assert!(reader.next_page().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drained_source_is_not_queried_again() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=3)));
        let mut reader = reader(source.clone(), 10);

        assert_eq!(reader.next_page().await.unwrap().len(), 3);
        assert!(reader.next_page().await.unwrap().is_empty());
        assert!(reader.next_page().await.unwrap().is_empty());
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let source = Arc::new(InMemoryRecordSource::new("empty", Vec::new()));
        let mut reader = reader(source, 10);
        let page = reader.next_page().await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.last_key, None);
        assert_eq!(reader.page_count(), 0);
    }

    #[tokio::test]
    async fn test_single_item_read() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=3)));
        let mut reader = reader(source, 2);

        let mut ids = Vec::new();
        while let Some(record) = reader.read().await.unwrap() {
            ids.push(record.id);
        }
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_reset_rewinds_cursor() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=4)));
        let mut reader = reader(source, 10);

        assert_eq!(reader.next_page().await.unwrap().len(), 4);
        reader.reset();
        assert_eq!(reader.last_key(), None);
        assert_eq!(reader.next_page().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_source_failure_carries_cursor() {
        let source = Arc::new(FailingSource::after_pages(numbered_rows(1..=30), 1));
        let mut reader = reader(source, 10);

        assert_eq!(reader.next_page().await.unwrap().len(), 10);
        let err = reader.next_page().await.unwrap_err();
        assert_eq!(err.last_key, Some(SortKey::Int(10)));
    }

    #[tokio::test]
    async fn test_failure_mid_page_keeps_cursor_at_last_delivered() {
        let source = Arc::new(FailingSource::after_pages(numbered_rows(1..=10), 3));
        let mut reader: PagedReader<TestRecord> = PagedReader::builder("partial")
            .source(source)
            .page_size(4)
            .fetch_size(2)
            .build()
            .unwrap();

        let first = reader.next_page().await.unwrap();
        assert_eq!(first.records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);

        // fetch 3 returns 5 and 6, fetch 4 fails
        let err = reader.next_page().await.unwrap_err();
        assert_eq!(err.last_key, Some(SortKey::Int(4)));
        assert_eq!(reader.last_key(), Some(&SortKey::Int(4)));
    }

    #[tokio::test]
    async fn test_failure_on_first_page_delivers_nothing() {
        let source = Arc::new(FailingSource::after_pages(numbered_rows(1..=10), 2));
        let mut reader: PagedReader<TestRecord> = PagedReader::builder("partial")
            .source(source)
            .page_size(6)
            .fetch_size(2)
            .build()
            .unwrap();

        let err = reader.next_page().await.unwrap_err();
        assert_eq!(err.last_key, None);
        assert_eq!(reader.last_key(), None);
        assert_eq!(reader.page_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_row_mid_page_leaves_cursor_unmoved() {
        let source = Arc::new(InMemoryRecordSource::new("teachers", numbered_rows(1..=2)));
        source.insert(Row::new().with("id", 3));
        let mut reader: PagedReader<TestRecord> = PagedReader::builder("decode")
            .source(source.clone())
            .page_size(3)
            .fetch_size(1)
            .build()
            .unwrap();

        let err = reader.next_page().await.unwrap_err();
        assert_eq!(err.last_key, None);
        assert_eq!(reader.last_key(), None);
    }

    #[tokio::test]
    async fn test_malformed_row_is_read_error() {
        let rows = vec![Row::new().with("id", 1)];
        let source = Arc::new(InMemoryRecordSource::new("broken", rows));
        let mut reader = reader(source, 10);

        let err = reader.next_page().await.unwrap_err();
        assert_eq!(err.reader, "test-reader");
        assert!(err.message.contains("name"));
    }

    #[test]
    fn test_builder_validation() {
        let missing_source = PagedReader::<TestRecord>::builder("r").build();
        assert_eq!(missing_source.unwrap_err().code, "READER-NO-SOURCE");

        let source: Arc<dyn RecordSource> = Arc::new(InMemoryRecordSource::new("s", Vec::new()));
        let zero = PagedReader::<TestRecord>::builder("r")
            .source(source.clone())
            .page_size(0)
            .build();
        assert_eq!(zero.unwrap_err().code, "READER-ZERO-SIZE");

        let ok = PagedReader::<TestRecord>::builder("r").source(source).build().unwrap();
        assert_eq!(ok.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(ok.fetch_size(), DEFAULT_PAGE_SIZE);
    }
}
