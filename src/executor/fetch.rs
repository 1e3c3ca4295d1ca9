use std::{collections::HashSet, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    executor::{Cell, CursorKind, Row, Statement, Store},
    QueryError, QueryResult,
};

/// How the rows of a run are retrieved. All strategies return the same rows
/// in the same order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// a named server-side cursor
    #[default]
    Cursor,
    /// a streaming connection
    Connection,
    /// batches sized from the total count, with repeated strings folded
    Chunked,
}

impl FetchStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            FetchStrategy::Cursor => "cursor",
            FetchStrategy::Connection => "connection",
            FetchStrategy::Chunked => "chunked",
        }
    }

    pub fn cursor_kind(&self) -> CursorKind {
        match self {
            FetchStrategy::Cursor => CursorKind::Named,
            FetchStrategy::Connection | FetchStrategy::Chunked => CursorKind::Streaming,
        }
    }
}

impl FromStr for FetchStrategy {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cursor" | "raw" => Ok(FetchStrategy::Cursor),
            "connection" | "core" => Ok(FetchStrategy::Connection),
            "chunked" | "orm" => Ok(FetchStrategy::Chunked),
            other => Err(QueryError::usage(format!("fetch strategy must be cursor, connection or chunked, got '{other}'"))),
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Batch size for chunked fetching: the order of magnitude of `total`,
/// capped at `cap`.
pub fn chunk_rows(total: u64, cap: usize) -> usize {
    let cap = cap.max(1);
    if total == 0 {
        return 1;
    }
    let magnitude = 10u64.saturating_pow(total.ilog10());
    usize::try_from(magnitude).unwrap_or(usize::MAX).clamp(1, cap)
}

/// Makes equal text cells share one allocation.
#[derive(Debug, Default)]
pub struct StringFolder {
    seen: HashSet<Arc<str>>,
}

impl StringFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, row: Row) -> Row {
        Row(row.0.into_iter().map(|cell| self.fold_cell(cell)).collect())
    }

    fn fold_cell(&mut self, cell: Cell) -> Cell {
        match cell {
            Cell::Text(text) => match self.seen.get(&*text) {
                Some(shared) => Cell::Text(Arc::clone(shared)),
                None => {
                    self.seen.insert(Arc::clone(&text));
                    Cell::Text(text)
                }
            },
            other => other,
        }
    }

    pub fn distinct(&self) -> usize {
        self.seen.len()
    }
}

/// Pulls every row of `statement` using `strategy`.
///
/// With `streaming` the rows arrive in batches of at most `chunk_size`,
/// otherwise in one batch.
pub fn fetch_rows(
    store: &dyn Store,
    statement: &Statement,
    strategy: FetchStrategy,
    total: u64,
    streaming: bool,
    chunk_size: usize,
) -> QueryResult<(Vec<String>, Vec<Row>)> {
    let mut cursor = store.open_cursor(statement, strategy.cursor_kind())?;
    let columns = cursor.columns().to_vec();

    let batch = match (strategy, streaming) {
        (_, false) => usize::MAX,
        (FetchStrategy::Chunked, true) => chunk_rows(total, chunk_size),
        (_, true) => chunk_size.max(1),
    };
    let mut folder = (strategy == FetchStrategy::Chunked).then(StringFolder::new);

    let mut rows = Vec::new();
    let mut batches = 0usize;
    loop {
        let fetched = cursor.fetch_many(batch)?;
        if fetched.is_empty() {
            break;
        }
        batches += 1;
        let done = fetched.len() < batch;
        match folder.as_mut() {
            Some(folder) => rows.extend(fetched.into_iter().map(|r| folder.fold(r))),
            None => rows.extend(fetched),
        }
        if done {
            break;
        }
    }

    debug!(strategy = %strategy, batch, batches, rows = rows.len(), "fetched rows");
    Ok((columns, rows))
}
