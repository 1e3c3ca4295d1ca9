use std::time::Instant;

use tracing::{debug, info, warn};

use crate::{
    config::{Mode, QueryConfig},
    executor::{fetch_rows, normalize_sql, pagination, HistoryEntry, ResultSet, RunOptions, Statement, Store},
    planner::CompiledQuery,
    QueryResult,
};

/// Stages of a local run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Compiled,
    Counting,
    Sliced,
    Fetching,
    Done,
    Failed,
}

/// Counts, slices and fetches a compiled query against a [`Store`].
pub struct QueryRunner<'a> {
    store: &'a dyn Store,
    config: &'a QueryConfig,
}

impl<'a> QueryRunner<'a> {
    pub fn new(store: &'a dyn Store, config: &'a QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn run(&self, query: &CompiledQuery, options: &RunOptions) -> QueryResult<ResultSet> {
        let mut state = RunState::Compiled;
        match self.advance(query, options, &mut state) {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!(state = ?state, error = %err, "query run failed");
                Self::transition(&mut state, RunState::Failed);
                Err(err)
            }
        }
    }

    fn advance(&self, query: &CompiledQuery, options: &RunOptions, state: &mut RunState) -> QueryResult<ResultSet> {
        let started = Instant::now();
        let sql = Statement::new(query).to_sql();

        Self::transition(state, RunState::Counting);
        let total = self.total_count(query, &sql)?;

        Self::transition(state, RunState::Sliced);
        let slice = pagination::slice(total, options, self.config);
        for warning in &slice.warnings {
            warn!(total, "{warning}");
        }

        Self::transition(state, RunState::Fetching);
        let statement = Statement::windowed(query, slice.window);
        let (columns, rows) = fetch_rows(
            self.store,
            &statement,
            options.strategy,
            total,
            self.config.streaming,
            self.config.chunk_size,
        )?;

        Self::transition(state, RunState::Done);
        let runtime = started.elapsed();
        info!(rows = rows.len(), total, ?runtime, "query finished");

        Ok(ResultSet {
            count: rows.len() as u64,
            rows,
            columns,
            sql: statement.to_sql(),
            mode: Mode::Local,
            total_count: total,
            chunk: self.config.limit,
            runtime,
            response_time: None,
            start: slice.window.map(|w| w.0),
            end: slice.window.map(|w| w.1),
            warnings: slice.warnings,
            return_type: query.return_type,
        })
    }

    /// The stored count when the statement is in the history table, a live
    /// count otherwise. Connected runs then write the history record.
    fn total_count(&self, query: &CompiledQuery, sql: &str) -> QueryResult<u64> {
        let release = &self.config.release;
        let connected = self.store.is_connected();

        let cached = if connected {
            match self.store.find_history(&normalize_sql(sql), release) {
                Ok(record) => record.map(|r| r.count),
                Err(err) => {
                    warn!(error = %err, "history lookup failed, counting live");
                    None
                }
            }
        } else {
            None
        };

        let total = match cached {
            Some(count) => {
                debug!(count, "count from history");
                count
            }
            None => self.store.count(&Statement::new(query))?,
        };

        if connected {
            match self.store.record_history(HistoryEntry::for_query(query, sql, release, total)) {
                Ok(record) => debug!(id = %record.id, n_run = record.n_run, "history recorded"),
                Err(err) => warn!(error = %err, "could not write query history"),
            }
        }
        Ok(total)
    }

    fn transition(state: &mut RunState, next: RunState) {
        debug!(from = ?*state, to = ?next, "run state");
        *state = next;
    }
}
