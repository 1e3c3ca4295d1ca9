use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, RwLock,
    },
};

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    catalog::{Pipeline, DATA_SCHEMA},
    executor::{
        CursorKind, HistoryEntry, HistoryLog, PlanExecutor, QueryHistoryRecord, Row, RowCursor, Statement, Store,
        TableSource,
    },
    planner::PipelineLookup,
    QueryError, QueryResult,
};

/// A [`Store`] over in-memory tables of JSON objects.
///
/// Tables are keyed by their qualified name (`schema.table`). The history
/// table sits behind a mutex, which serialises writers the way a store
/// transaction would.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
    history: Mutex<HistoryLog>,
    connected: AtomicBool,
    pipeline_info: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            history: Mutex::new(HistoryLog::new()),
            connected: AtomicBool::new(true),
            pipeline_info: format!("{DATA_SCHEMA}.pipeline_info"),
        }
    }

    /// Append a JSON array of objects to `qualified`, creating it if needed.
    pub fn load_from_json(&self, qualified: &str, rows: Value) -> QueryResult<usize> {
        let Value::Array(items) = rows else {
            return Err(QueryError::usage(format!("rows for {qualified} must be a JSON array")));
        };
        let mut objects = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Object(map) => objects.push(map),
                other => return Err(QueryError::usage(format!("row of {qualified} is not an object: {other}"))),
            }
        }

        let loaded = objects.len();
        let mut tables = self.tables.write().map_err(|_| QueryError::connectivity("table lock poisoned"))?;
        tables.entry(qualified.to_string()).or_default().extend(objects);
        debug!(table = qualified, rows = loaded, "loaded rows");
        Ok(loaded)
    }

    /// Register the pipeline-info row for `pipeline` at `version`.
    pub fn add_pipeline_version(&self, pk: i64, pipeline: Pipeline, version: &str) -> QueryResult<()> {
        let row = serde_json::json!([{ "pk": pk, "pipeline": pipeline.label(), "version": version }]);
        self.load_from_json(&self.pipeline_info.clone(), row).map(|_| ())
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Snapshot of the history table.
    pub fn history(&self) -> QueryResult<Vec<QueryHistoryRecord>> {
        Ok(self.lock_history()?.records().to_vec())
    }

    fn ensure_connected(&self) -> QueryResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(QueryError::connectivity("store is not reachable"))
        }
    }

    fn lock_history(&self) -> QueryResult<std::sync::MutexGuard<'_, HistoryLog>> {
        self.history.lock().map_err(|_| QueryError::connectivity("history lock poisoned"))
    }
}

impl TableSource for MemoryStore {
    fn table_rows(&self, qualified: &str) -> QueryResult<Vec<Map<String, Value>>> {
        let tables = self.tables.read().map_err(|_| QueryError::connectivity("table lock poisoned"))?;
        Ok(tables.get(qualified).cloned().unwrap_or_default())
    }
}

impl PipelineLookup for MemoryStore {
    fn pipeline_info_pk(&self, pipeline: Pipeline, version: &str) -> QueryResult<Option<i64>> {
        self.ensure_connected()?;
        let rows = self.table_rows(&self.pipeline_info)?;
        Ok(rows
            .iter()
            .find(|r| {
                r.get("pipeline").and_then(Value::as_str) == Some(pipeline.label())
                    && r.get("version").and_then(Value::as_str) == Some(version)
            })
            .and_then(|r| r.get("pk"))
            .and_then(Value::as_i64))
    }
}

/// Rows materialised at open time and handed out in batches.
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
}

impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch_many(&mut self, n: usize) -> QueryResult<Vec<Row>> {
        Ok(self.rows.by_ref().take(n).collect())
    }
}

impl Store for MemoryStore {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn count(&self, statement: &Statement) -> QueryResult<u64> {
        self.ensure_connected()?;
        PlanExecutor::new(statement.query).count(self, statement.window)
    }

    fn open_cursor(&self, statement: &Statement, kind: CursorKind) -> QueryResult<Box<dyn RowCursor + '_>> {
        self.ensure_connected()?;
        let rows: Vec<Row> = PlanExecutor::new(statement.query)
            .execute(self, statement.window)?
            .iter()
            .map(|values| Row::from_values(values))
            .collect();
        debug!(?kind, rows = rows.len(), "opened cursor");
        Ok(Box::new(MemoryCursor { columns: statement.query.field_order(), rows: rows.into_iter() }))
    }

    fn find_history(&self, sql: &str, release: &str) -> QueryResult<Option<QueryHistoryRecord>> {
        self.ensure_connected()?;
        Ok(self.lock_history()?.find(sql, release).cloned())
    }

    fn record_history(&self, entry: HistoryEntry) -> QueryResult<QueryHistoryRecord> {
        self.ensure_connected()?;
        Ok(self.lock_history()?.upsert(entry))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn loads_arrays_of_objects_only() {
        let store = MemoryStore::new();
        assert_eq!(store.load_from_json("s.t", json!([{ "a": 1 }, { "a": 2 }])).unwrap(), 2);
        assert_eq!(store.table_rows("s.t").unwrap().len(), 2);
        assert!(store.load_from_json("s.t", json!({ "a": 1 })).is_err());
        assert!(store.load_from_json("s.t", json!([1])).is_err());
        assert!(store.table_rows("s.none").unwrap().is_empty());
    }

    #[test]
    fn pipeline_lookup() {
        let store = MemoryStore::new();
        store.add_pipeline_version(25, Pipeline::Drp, "v2_4_3").unwrap();
        store.add_pipeline_version(26, Pipeline::Dap, "2.2.1").unwrap();
        assert_eq!(store.pipeline_info_pk(Pipeline::Drp, "v2_4_3").unwrap(), Some(25));
        assert_eq!(store.pipeline_info_pk(Pipeline::Dap, "v2_4_3").unwrap(), None);
    }

    #[test]
    fn disconnected_store_fails_with_connectivity() {
        let store = MemoryStore::new();
        store.set_connected(false);
        let err = store.pipeline_info_pk(Pipeline::Drp, "v2_4_3").unwrap_err();
        assert!(err.is_connectivity());
        assert!(store.find_history("SELECT 1", "DR15").unwrap_err().is_connectivity());
    }
}
