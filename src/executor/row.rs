use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

/// One value of a result row.
///
/// Text is reference counted so that repeated categorical values can share
/// one allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(Arc<str>),
}

impl Cell {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(Arc::from(s.as_str())),
            other => Cell::Text(Arc::from(other.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Text(s) => Value::String(s.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// One result tuple, in the order of the result's columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(pub Vec<Cell>);

impl Row {
    pub fn from_values(values: &[Value]) -> Self {
        Row(values.iter().map(Cell::from_json).collect())
    }

    pub fn get(&self, index: usize) -> Option<&Cell> { self.0.get(index) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn cells(&self) -> &[Cell] { &self.0 }

    /// The row as an object keyed by `columns`.
    pub fn to_json(&self, columns: &[String]) -> Value {
        let map: Map<String, Value> = columns.iter().cloned().zip(self.0.iter().map(Cell::to_json)).collect();
        Value::Object(map)
    }
}
