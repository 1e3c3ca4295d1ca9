use std::fmt;

use crate::parser::ast::{ComparatorOp, Literal};

/// Leaf of a filter: `field op value`. The field is kept as written (after
/// shortcut substitution); resolving it against the catalog is the compiler's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub field: String,
    pub op: ComparatorOp,
    pub value: Literal,
}

impl Condition {
    pub fn new(field: &str, op: ComparatorOp, value: Literal) -> Self {
        Self { field: field.to_string(), op, value }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}
