use serde::{Deserialize, Serialize};

use crate::parser::ast::Literal;

/// Value kind of a catalog column.
///
/// Drives filter validation: ordering comparisons need a numeric kind and
/// wildcard patterns need `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Int,
    Float,
    String,
    Bool,
}

impl ParamType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamType::Int | ParamType::Float)
    }

    /// Whether a literal can be compared against a column of this kind.
    ///
    /// Ints and floats are interchangeable; text columns accept any literal
    /// since bare words such as `8485-1901` are text.
    pub fn accepts(&self, literal: &Literal) -> bool {
        match (self, literal) {
            (ParamType::Int | ParamType::Float, Literal::Int(_) | Literal::Float(_)) => true,
            (ParamType::String, _) => true,
            (ParamType::Bool, Literal::Bool(_)) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Int => "an integer",
            ParamType::Float => "a number",
            ParamType::String => "a string",
            ParamType::Bool => "a boolean",
        }
    }
}
