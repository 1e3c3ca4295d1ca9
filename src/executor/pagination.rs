use tracing::debug;

use crate::{config::QueryConfig, executor::FetchStrategy};

/// Caller choices for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub return_all: bool,
    pub strategy: FetchStrategy,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, start: Option<u64>, end: Option<u64>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
    pub fn with_return_all(mut self, return_all: bool) -> Self { self.return_all = return_all; self }
    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self { self.strategy = strategy; self }

    fn explicit_window(&self, limit: u64) -> Option<(u64, u64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end.max(start))),
            (Some(start), None) => Some((start, start.saturating_add(limit))),
            (None, Some(end)) => Some((0, end)),
            (None, None) => None,
        }
    }
}

/// The served part of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub window: Option<(u64, u64)>,
    /// rows served
    pub count: u64,
    pub warnings: Vec<String>,
}

/// Decide the served window for `total` matching rows.
pub fn slice(total: u64, options: &RunOptions, config: &QueryConfig) -> Slice {
    let served = |window: Option<(u64, u64)>| match window {
        Some((start, end)) => end.min(total).saturating_sub(start),
        None => total,
    };

    if let Some(window) = options.explicit_window(config.limit) {
        debug!(start = window.0, end = window.1, "getting subset of data");
        return Slice { window: Some(window), count: served(Some(window)), warnings: vec![] };
    }

    if total > config.count_threshold && !options.return_all {
        let window = Some((0, config.limit));
        return Slice {
            window,
            count: served(window),
            warnings: vec![format!(
                "Results contain more than {} entries. Only returning first {}",
                config.count_threshold, config.limit
            )],
        };
    }

    if options.return_all {
        return Slice {
            window: None,
            count: total,
            warnings: vec!["Attempting to return all results. This may take a long time or crash.".to_string()],
        };
    }

    Slice { window: None, count: total, warnings: vec![] }
}
