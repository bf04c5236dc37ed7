//! The `teacher` table.

use chunkflow::errors::ReadError;
use chunkflow::item::{FromRow, InMemoryRecordSource, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the backing table.
pub const TEACHER_TABLE: &str = "teacher";

const SEED_NAMES: [&str; 12] = [
    "Kim", "Lee", "Park", "Choi", "Jung", "Kang", "Cho", "Yoon", "Jang", "Lim", "Han", "Oh",
];

/// A row of the `teacher` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Primary key.
    pub id: i64,
    /// Teacher name.
    pub name: String,
}

impl Teacher {
    /// Creates a teacher.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Converts to a raw row.
    #[must_use]
    pub fn to_row(&self) -> Row {
        Row::new().with("id", self.id).with("name", self.name.as_str())
    }
}

impl FromRow for Teacher {
    fn from_row(row: &Row) -> Result<Self, ReadError> {
        Ok(Self {
            id: row.require_i64("id")?,
            name: row.require_str("name")?.to_string(),
        })
    }
}

impl fmt::Display for Teacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Teacher(id={}, name={})", self.id, self.name)
    }
}

/// Builds the table from `teachers`.
#[must_use]
pub fn teacher_table(teachers: &[Teacher]) -> InMemoryRecordSource {
    InMemoryRecordSource::new(TEACHER_TABLE, teachers.iter().map(Teacher::to_row).collect())
}

/// Returns the demo rows: twelve teachers with ids 1 to 12.
#[must_use]
pub fn seed_teachers() -> Vec<Teacher> {
    SEED_NAMES
        .iter()
        .zip(1..)
        .map(|(name, id)| Teacher::new(id, *name))
        .collect()
}
