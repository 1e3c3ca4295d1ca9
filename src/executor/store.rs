use crate::{
    executor::{HistoryEntry, QueryHistoryRecord, Row},
    planner::{CompiledQuery, PipelineLookup, SqlWriter},
    QueryResult,
};

/// How rows are pulled off the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// a named, server-side cursor
    Named,
    /// a connection with streamed results
    Streaming,
}

/// A compiled query restricted to an optional `[start, end)` window.
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    pub query: &'a CompiledQuery,
    pub window: Option<(u64, u64)>,
}

impl<'a> Statement<'a> {
    pub fn new(query: &'a CompiledQuery) -> Self {
        Self { query, window: None }
    }

    pub fn windowed(query: &'a CompiledQuery, window: Option<(u64, u64)>) -> Self {
        Self { query, window }
    }

    pub fn to_sql(&self) -> String {
        SqlWriter::new(self.query).statement(self.window)
    }
}

pub trait RowCursor {
    fn columns(&self) -> &[String];

    /// Up to `n` further rows; empty once exhausted.
    fn fetch_many(&mut self, n: usize) -> QueryResult<Vec<Row>>;
}

/// A relational store able to run compiled queries and keep the query
/// history table.
///
/// Every method fails with a connectivity error when the store cannot be
/// reached.
pub trait Store: PipelineLookup + Send + Sync {
    fn is_connected(&self) -> bool;

    fn count(&self, statement: &Statement) -> QueryResult<u64>;

    fn open_cursor(&self, statement: &Statement, kind: CursorKind) -> QueryResult<Box<dyn RowCursor + '_>>;

    fn find_history(&self, sql: &str, release: &str) -> QueryResult<Option<QueryHistoryRecord>>;

    /// Insert or increment, inside one transaction.
    fn record_history(&self, entry: HistoryEntry) -> QueryResult<QueryHistoryRecord>;
}
