use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::{catalog::ReturnType, config::Mode, executor::{Cell, Row}};

/// Rows of a run plus the bookkeeping around them. Local and remote runs
/// produce the same shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub rows: Vec<Row>,
    /// field order of every row
    pub columns: Vec<String>,
    pub sql: String,
    pub mode: Mode,
    /// rows served
    pub count: u64,
    pub total_count: u64,
    pub chunk: u64,
    pub runtime: Duration,
    /// transport time, remote runs only
    pub response_time: Option<Duration>,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub warnings: Vec<String>,
    pub return_type: Option<ReturnType>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let i = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|r| r.get(i)).collect())
    }

    /// Whether more rows exist than were served.
    pub fn is_truncated(&self) -> bool {
        self.count < self.total_count
    }

    /// Rows as JSON objects keyed by column.
    pub fn to_json(&self) -> Value {
        Value::Array(self.rows.iter().map(|r| r.to_json(&self.columns)).collect())
    }
}
