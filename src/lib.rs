pub mod error;
pub use error::{QueryError, QueryResult};

pub mod config;
pub use config::{Mode, QueryConfig, ReleaseVersions};

pub mod catalog;
pub use catalog::{ParamDisplay, ParameterCatalog, ReturnType, MANGA_CATALOG};

pub mod parser;
pub mod graph;

pub mod planner;
pub use planner::{CompiledQuery, QueryCompiler, QueryRequest, SortOrder};

pub mod executor;
pub use executor::{FetchStrategy, QueryHistoryRecord, QueryRunner, ResultSet, Row, RunOptions, Store};

pub mod database;
pub use database::MemoryStore;

pub mod remote;
pub use remote::{RemoteAdapter, RpcChannel, RpcReply};

pub mod query;
pub use query::{do_query, Query, QueryEnv, ShowProp};
