pub mod operators;
pub use operators::*;

pub mod literal;
pub use literal::*;

pub mod condition;
pub use condition::*;

pub mod function_condition;
pub use function_condition::*;

pub mod filter_node;
pub use filter_node::*;
