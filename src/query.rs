use std::{fmt, str::FromStr};

use tracing::{debug, warn};

use crate::{
    catalog::{ParamDisplay, ParameterCatalog, Pipeline, MANGA_CATALOG},
    config::{Mode, QueryConfig},
    executor::{FetchStrategy, QueryRunner, ResultSet, RunOptions, Store},
    planner::{CompiledQuery, PipelineLookup, QueryCompiler, QueryRequest},
    remote::{RemoteAdapter, RpcChannel},
    QueryError, QueryResult,
};

/// What [`Query::show`] prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShowProp {
    /// the whole statement
    #[default]
    Query,
    /// the joined tables
    Joins,
    /// the WHERE clause
    Filter,
}

impl FromStr for ShowProp {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(ShowProp::Query),
            "joins" => Ok(ShowProp::Joins),
            "filter" => Ok(ShowProp::Filter),
            other => Err(QueryError::usage(format!("show accepts query, joins or filter, got '{other}'"))),
        }
    }
}

impl fmt::Display for ShowProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShowProp::Query => f.write_str("query"),
            ShowProp::Joins => f.write_str("joins"),
            ShowProp::Filter => f.write_str("filter"),
        }
    }
}

/// The backends a [`Query`] may use.
#[derive(Clone, Copy)]
pub struct QueryEnv<'a> {
    pub catalog: &'a ParameterCatalog,
    pub store: Option<&'a dyn Store>,
    pub channel: Option<&'a dyn RpcChannel>,
}

impl Default for QueryEnv<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> QueryEnv<'a> {
    pub fn new() -> Self {
        Self { catalog: &*MANGA_CATALOG, store: None, channel: None }
    }

    pub fn with_catalog(mut self, catalog: &'a ParameterCatalog) -> Self { self.catalog = catalog; self }
    pub fn with_store(mut self, store: &'a dyn Store) -> Self { self.store = Some(store); self }
    pub fn with_channel(mut self, channel: &'a dyn RpcChannel) -> Self { self.channel = Some(channel); self }
}

/// A request bound to a configuration and a backend.
///
/// Local mode compiles against the store up front. Auto mode does the same
/// but switches to remote once when the store cannot be reached, at
/// construction or on the first failing run.
pub struct Query<'a> {
    request: QueryRequest,
    config: QueryConfig,
    env: QueryEnv<'a>,
    mode: Mode,
    compiled: Option<CompiledQuery>,
}

impl<'a> Query<'a> {
    pub fn new(request: QueryRequest, config: QueryConfig, env: QueryEnv<'a>) -> QueryResult<Self> {
        let mut query = Self { request, config, env, mode: Mode::Local, compiled: None };

        match query.config.mode {
            Mode::Local => query.compiled = Some(query.compile_local()?),
            Mode::Remote => query.use_remote()?,
            Mode::Auto => match query.compile_local() {
                Ok(compiled) => query.compiled = Some(compiled),
                Err(err) if err.is_connectivity() => {
                    warn!(error = %err, "local store unavailable, switching to remote");
                    query.use_remote()?;
                }
                Err(err) => return Err(err),
            },
        }

        debug!(mode = %query.mode, "query ready");
        Ok(query)
    }

    /// The resolved backend, never `Auto`.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// The locally compiled statement, `None` in remote mode.
    pub fn compiled(&self) -> Option<&CompiledQuery> {
        self.compiled.as_ref()
    }

    pub fn run(&mut self, start: Option<u64>, end: Option<u64>, strategy: FetchStrategy) -> QueryResult<ResultSet> {
        let options = RunOptions::new()
            .with_window(start, end)
            .with_return_all(self.request.return_all)
            .with_strategy(strategy);

        if self.mode == Mode::Remote {
            return self.run_remote(&options);
        }

        match self.run_local(&options) {
            Err(err) if err.is_connectivity() && self.config.mode == Mode::Auto => {
                warn!(error = %err, "local run failed, retrying remotely");
                self.use_remote()?;
                self.run_remote(&options)
            }
            other => other,
        }
    }

    /// Text of the compiled statement, its joins or its filter. Remote
    /// queries have no local statement and show the search filter.
    pub fn show(&self, prop: ShowProp) -> String {
        let Some(compiled) = &self.compiled else {
            return self.request.filter_text().unwrap_or_default().to_string();
        };
        match prop {
            ShowProp::Query => compiled.to_sql(),
            ShowProp::Joins => compiled.join_names().join(", "),
            ShowProp::Filter => compiled.filter_sql().unwrap_or_default(),
        }
    }

    pub fn available_params(&self, display: ParamDisplay) -> Vec<String> {
        self.env.catalog.list_params(display)
    }

    fn compile_local(&self) -> QueryResult<CompiledQuery> {
        let store = self.env.store.ok_or_else(|| QueryError::connectivity("no local store configured"))?;
        if !store.is_connected() {
            return Err(QueryError::connectivity("local store is not reachable"));
        }
        let versions = self.config.versions()?;
        QueryCompiler::new(self.env.catalog, versions).compile(&self.request, &StoreLookup(store))
    }

    fn use_remote(&mut self) -> QueryResult<()> {
        if let Some(anchor) = &self.request.anchor {
            return Err(QueryError::usage(format!("cannot pin anchor table '{anchor}' in remote mode")));
        }
        if self.env.channel.is_none() {
            return Err(QueryError::connectivity("no remote channel configured"));
        }
        self.mode = Mode::Remote;
        self.compiled = None;
        Ok(())
    }

    fn run_local(&self, options: &RunOptions) -> QueryResult<ResultSet> {
        let store = self.env.store.ok_or_else(|| QueryError::connectivity("no local store configured"))?;
        let compiled = self.compiled.as_ref().ok_or_else(|| QueryError::usage("query was not compiled locally"))?;
        QueryRunner::new(store, &self.config).run(compiled, options)
    }

    fn run_remote(&self, options: &RunOptions) -> QueryResult<ResultSet> {
        let channel = self.env.channel.ok_or_else(|| QueryError::connectivity("no remote channel configured"))?;
        RemoteAdapter::new(channel, &self.config).run(&self.request, options)
    }
}

struct StoreLookup<'s>(&'s dyn Store);

impl PipelineLookup for StoreLookup<'_> {
    fn pipeline_info_pk(&self, pipeline: Pipeline, version: &str) -> QueryResult<Option<i64>> {
        self.0.pipeline_info_pk(pipeline, version)
    }
}

/// Build and run a query in one call.
pub fn do_query<'a>(
    request: QueryRequest,
    config: QueryConfig,
    env: QueryEnv<'a>,
    start: Option<u64>,
    end: Option<u64>,
    strategy: FetchStrategy,
) -> QueryResult<(Query<'a>, ResultSet)> {
    let mut query = Query::new(request, config, env)?;
    let result = query.run(start, end, strategy)?;
    Ok((query, result))
}
