pub mod ast;

pub mod filter_parser;
pub use filter_parser::*;

pub mod parse_error;
pub use parse_error::*;

pub mod word_comparer;
pub use word_comparer::*;

pub mod filter_comparers;
pub use filter_comparers::*;

pub mod shortcuts;
pub use shortcuts::*;
