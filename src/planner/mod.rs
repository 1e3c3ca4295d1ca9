pub mod query_request;
pub use query_request::*;

pub mod predicate;
pub use predicate::*;

pub mod compiled_query;
pub use compiled_query::*;

pub mod sql_writer;
pub use sql_writer::*;

pub mod filter_binder;
pub use filter_binder::*;

pub mod version_binder;
pub use version_binder::*;

pub mod aggregate_rewrite;
pub use aggregate_rewrite::*;

pub mod query_compiler;
pub use query_compiler::*;
