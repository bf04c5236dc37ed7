//! Batch configuration.

use crate::errors::BatchError;
use crate::events::{EventSink, LoggingEventSink};
use crate::item::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Sizes and logging settings shared by the jobs of one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Items per written chunk.
    #[serde(default = "default_size")]
    pub chunk_size: usize,
    /// Records per logical page.
    #[serde(default = "default_size")]
    pub page_size: usize,
    /// Rows per call to the record source.
    #[serde(default = "default_size")]
    pub fetch_size: usize,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Level at which lifecycle events are logged.
    #[serde(default = "default_event_level")]
    pub event_level: String,
}

fn default_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_event_level() -> String {
    "info".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_size(),
            page_size: default_size(),
            fetch_size: default_size(),
            log_format: LogFormat::default(),
            event_level: default_event_level(),
        }
    }
}

impl BatchConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the fetch size.
    #[must_use]
    pub fn with_fetch_size(mut self, size: usize) -> Self {
        self.fetch_size = size;
        self
    }

    /// Sets the log format.
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Sets the event log level.
    #[must_use]
    pub fn with_event_level(mut self, level: impl Into<String>) -> Self {
        self.event_level = level.into();
        self
    }

    /// Parses and validates a JSON document. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, BatchError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BatchError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| BatchError::Config(format!("invalid configuration in {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every size is above zero.
    pub fn validate(&self) -> Result<(), BatchError> {
        for (key, value) in [
            ("chunk_size", self.chunk_size),
            ("page_size", self.page_size),
            ("fetch_size", self.fetch_size),
        ] {
            if value == 0 {
                return Err(BatchError::Config(format!("{key} must be above zero")));
            }
        }
        Ok(())
    }

    /// Returns a logging event sink at the configured level.
    #[must_use]
    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        Arc::new(LoggingEventSink::from_level_name(&self.event_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.fetch_size, 10);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = BatchConfig::from_json_str(r#"{"chunk_size": 3, "log_format": "json"}"#).unwrap();
        assert_eq!(config.chunk_size, 3);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.event_level, "info");
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = BatchConfig::from_json_str(r#"{"fetch_size": 0}"#).unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("fetch_size"));

        assert!(BatchConfig::new().with_page_size(0).validate().is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = BatchConfig::from_json_str("{chunk_size").unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"chunk_size": 5, "event_level": "debug"}}"#).unwrap();

        let config = BatchConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.event_level, "debug");
    }

    #[test]
    fn test_malformed_file_names_path_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{chunk_size").unwrap();

        let message = BatchConfig::from_json_file(file.path()).unwrap_err().to_string();
        assert!(message.contains(&file.path().display().to_string()));
        assert_eq!(message.matches("Configuration error").count(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = BatchConfig::from_json_file("/nonexistent/chunkflow.json").unwrap_err();
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn test_builder_setters() {
        let config = BatchConfig::new()
            .with_chunk_size(2)
            .with_fetch_size(1)
            .with_log_format(LogFormat::Json)
            .with_event_level("debug");
        assert_eq!((config.chunk_size, config.fetch_size), (2, 1));
        assert_eq!(config.log_format.to_string(), "json");
    }
}
