pub mod join_graph;
pub use join_graph::*;

pub mod join_plan;
pub use join_plan::*;

pub mod join_resolver;
pub use join_resolver::*;
