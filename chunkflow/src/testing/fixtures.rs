//! Row fixtures.

use crate::errors::ReadError;
use crate::item::{FromRow, Row};
use serde::{Deserialize, Serialize};

/// A minimal record with an id and a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Unique id, used as the sort key.
    pub id: i64,
    /// Display name.
    pub name: String,
}

impl FromRow for TestRecord {
    fn from_row(row: &Row) -> Result<Self, ReadError> {
        Ok(Self {
            id: row.require_i64("id")?,
            name: row.require_str("name")?.to_string(),
        })
    }
}

/// Builds rows `{id, name: "name-{id}"}` for every id given.
pub fn numbered_rows(ids: impl IntoIterator<Item = i64>) -> Vec<Row> {
    ids.into_iter()
        .map(|id| Row::new().with("id", id).with("name", format!("name-{id}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_rows_decode() {
        let rows = numbered_rows([4, 2]);
        let records: Vec<TestRecord> = rows.iter().map(|r| TestRecord::from_row(r).unwrap()).collect();
        assert_eq!(records[0], TestRecord { id: 4, name: "name-4".to_string() });
        assert_eq!(records[1].id, 2);
    }
}
