use std::fmt;

use crate::parser::ast::{ComparatorOp, Condition, Literal};

/// Aggregate filters known to the compiler. Names are checked when the filter
/// is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// `npergood(cond) op pct`: groups where the rows satisfying `cond` are
    /// `op pct` percent of the group's valid rows.
    PercentOfGood,
}

impl FunctionKind {
    pub fn from_name(name: &str) -> Option<FunctionKind> {
        match name.to_ascii_lowercase().as_str() {
            "npergood" => Some(FunctionKind::PercentOfGood),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FunctionKind::PercentOfGood => "npergood",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCondition {
    pub kind: FunctionKind,
    pub condition: Condition,
    pub op: ComparatorOp,
    pub value: Literal,
}

impl FunctionCondition {
    /// The threshold as a fraction, `20` percent is `0.2`.
    pub fn fraction(&self) -> f64 {
        self.value.as_f64().unwrap_or_default() / 100.0
    }
}

impl fmt::Display for FunctionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) {} {}", self.kind.name(), self.condition, self.op, self.value)
    }
}
