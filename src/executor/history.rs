use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::planner::CompiledQuery;

/// Collapse runs of whitespace so that formatting never splits a history key.
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What a run reports to the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub sql: String,
    pub release: String,
    pub search_filter: String,
    pub return_params: String,
    pub count: u64,
}

impl HistoryEntry {
    pub fn for_query(query: &CompiledQuery, sql: &str, release: &str, count: u64) -> Self {
        let search_filter = query
            .filter
            .as_ref()
            .map(|f| f.to_string().chars().filter(|c| !c.is_whitespace()).collect())
            .unwrap_or_default();
        Self {
            sql: normalize_sql(sql),
            release: release.to_string(),
            search_filter,
            return_params: query.field_order().join(","),
            count,
        }
    }
}

/// A row of the query history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHistoryRecord {
    pub id: Uuid,
    pub sql: String,
    pub release: String,
    pub search_filter: String,
    pub return_params: String,
    pub count: u64,
    pub n_run: u64,
    pub created: DateTime<Utc>,
}

impl QueryHistoryRecord {
    pub fn from_entry(entry: HistoryEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            sql: entry.sql,
            release: entry.release,
            search_filter: entry.search_filter,
            return_params: entry.return_params,
            count: entry.count,
            n_run: 1,
            created: Utc::now(),
        }
    }

    pub fn is_for(&self, sql: &str, release: &str) -> bool {
        self.sql == normalize_sql(sql) && self.release == release
    }
}

/// In-memory history table. Callers serialise access, usually behind a
/// mutex standing in for the store transaction.
#[derive(Debug, Default, Clone)]
pub struct HistoryLog {
    records: Vec<QueryHistoryRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, sql: &str, release: &str) -> Option<&QueryHistoryRecord> {
        self.records.iter().find(|r| r.is_for(sql, release))
    }

    /// Insert a new record or bump the run counter of the existing one.
    pub fn upsert(&mut self, entry: HistoryEntry) -> QueryHistoryRecord {
        if let Some(record) = self.records.iter_mut().find(|r| r.is_for(&entry.sql, &entry.release)) {
            record.n_run += 1;
            return record.clone();
        }
        let record = QueryHistoryRecord::from_entry(entry);
        self.records.push(record.clone());
        record
    }

    pub fn records(&self) -> &[QueryHistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sql: &str) -> HistoryEntry {
        HistoryEntry {
            sql: normalize_sql(sql),
            release: "DR15".into(),
            search_filter: "nsa.z<0.1".into(),
            return_params: "cube.mangaid".into(),
            count: 42,
        }
    }

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(normalize_sql("SELECT  a\n FROM\tb "), "SELECT a FROM b");
    }

    #[test]
    fn upsert_increments_existing() {
        let mut log = HistoryLog::new();
        let first = log.upsert(entry("SELECT a FROM b"));
        assert_eq!(first.n_run, 1);
        let second = log.upsert(entry("SELECT a  FROM b"));
        assert_eq!(second.n_run, 2);
        assert_eq!(second.id, first.id);
        assert_eq!(log.len(), 1);
        assert_eq!(log.find("SELECT a FROM b", "DR15").map(|r| r.count), Some(42));
        assert!(log.find("SELECT a FROM b", "MPL-5").is_none());
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = QueryHistoryRecord::from_entry(entry("SELECT 1"));
        let text = serde_json::to_string(&record).unwrap();
        let back: QueryHistoryRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }
}
