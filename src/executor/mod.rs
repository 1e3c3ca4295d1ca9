pub mod helpers;
pub mod eval;

pub mod plan_executor;
pub use plan_executor::*;

pub mod row;
pub use row::*;

pub mod history;
pub use history::*;

pub mod store;
pub use store::*;

pub mod pagination;
pub use pagination::{RunOptions, Slice};

pub mod fetch;
pub use fetch::*;

pub mod result_set;
pub use result_set::*;

pub mod query_runner;
pub use query_runner::*;

#[cfg(test)]
pub(crate) mod _tests;
