use std::{collections::HashMap, fmt};

use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    executor::helpers::Helpers,
    parser::ast::{ComparatorOp, Literal},
    planner::{ColumnRef, Operand, Predicate},
};

/// SQL three-valued logic.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn from_bool(b: bool) -> Self {
        if b { Truth::True } else { Truth::False }
    }

    pub fn not(&self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    pub fn and(&self, b: Self) -> Self {
        match (self, b) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (Self::True, Self::True) => Self::True,
        }
    }

    pub fn or(&self, b: Self) -> Self {
        match (self, b) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (Self::False, Self::False) => Self::False,
        }
    }
}

impl fmt::Debug for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "Truth(True)"),
            Self::False => write!(f, "Truth(False)"),
            Self::Unknown => write!(f, "Truth(Unknown)"),
        }
    }
}

/// Evaluates one bound predicate over joined rows keyed `qualifier.column`.
///
/// LIKE patterns are compiled when the evaluator is built, once per
/// predicate rather than once per row.
pub struct Eval<'p> {
    predicate: &'p Predicate,
    patterns: HashMap<&'p str, Regex>,
}

impl<'p> Eval<'p> {
    pub fn new(predicate: &'p Predicate) -> Self {
        let mut patterns = HashMap::new();
        Self::compile_patterns(predicate, &mut patterns);
        Self { predicate, patterns }
    }

    /// Whether the row passes a WHERE clause: only `True` does.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.eval(row) == Truth::True
    }

    pub fn eval(&self, row: &Map<String, Value>) -> Truth {
        self.eval_predicate3(self.predicate, row)
    }

    pub fn compiled_patterns(&self) -> usize {
        self.patterns.len()
    }

    fn eval_predicate3(&self, predicate: &Predicate, row: &Map<String, Value>) -> Truth {
        match predicate {
            Predicate::And(v) => v.iter().fold(Truth::True, |acc, x| acc.and(self.eval_predicate3(x, row))),
            Predicate::Or(v) => v.iter().fold(Truth::False, |acc, x| acc.or(self.eval_predicate3(x, row))),
            Predicate::Not(inner) => self.eval_predicate3(inner, row).not(),
            Predicate::Compare { left, op, right } => {
                let l = Self::column(left, row);
                let r = Self::operand(right, row);
                Self::cmp3(&l, *op, &r)
            }
            Predicate::Like { column, pattern, negated } => {
                let t = match Self::column(column, row) {
                    Value::String(s) => Truth::from_bool(
                        self.patterns.get(pattern.as_str()).is_some_and(|re| re.is_match(&s)),
                    ),
                    _ => Truth::Unknown,
                };
                if *negated { t.not() } else { t }
            }
        }
    }

    fn compile_patterns(predicate: &'p Predicate, patterns: &mut HashMap<&'p str, Regex>) {
        match predicate {
            Predicate::And(v) | Predicate::Or(v) => v.iter().for_each(|p| Self::compile_patterns(p, patterns)),
            Predicate::Not(inner) => Self::compile_patterns(inner, patterns),
            Predicate::Compare { .. } => {}
            Predicate::Like { pattern, .. } => {
                if !patterns.contains_key(pattern.as_str()) {
                    if let Some(re) = Self::like_regex(pattern) {
                        patterns.insert(pattern.as_str(), re);
                    }
                }
            }
        }
    }

    pub fn column(column: &ColumnRef, row: &Map<String, Value>) -> Value {
        row.get(&column.key()).cloned().unwrap_or(Value::Null)
    }

    pub fn literal(literal: &Literal) -> Value {
        match literal {
            Literal::Int(i) => Value::from(*i),
            Literal::Float(f) => Self::json_f(f.into_inner()),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::String(s) | Literal::Pattern(s) => Value::String(s.clone()),
        }
    }

    fn operand(operand: &Operand, row: &Map<String, Value>) -> Value {
        match operand {
            Operand::Literal(l) => Self::literal(l),
            Operand::Scaled { factor, column } => match Self::column(column, row).as_f64() {
                Some(v) => Self::json_f(factor.into_inner() * v),
                None => Value::Null,
            },
        }
    }

    fn cmp3(l: &Value, op: ComparatorOp, r: &Value) -> Truth {
        if l.is_null() || r.is_null() {
            return Truth::Unknown;
        }
        match Helpers::cmp_values(l, r) {
            Some(ord) => Truth::from_bool(op.holds(ord)),
            None => Truth::Unknown,
        }
    }

    /// Anchored regex for a LIKE pattern with `%` and `_`, no escapes.
    pub fn like_regex(pattern: &str) -> Option<Regex> {
        let mut regex = String::from("^");
        for ch in pattern.chars() {
            match ch {
                '%' => regex.push_str(".*"),
                '_' => regex.push('.'),
                c => regex.push_str(&regex::escape(&c.to_string())),
            }
        }
        regex.push('$');
        Regex::new(&regex).ok()
    }

    fn json_f(f: f64) -> Value {
        serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}
