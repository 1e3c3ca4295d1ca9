use std::cmp::Ordering;

use serde_json::Value;

pub struct Helpers;

impl Helpers {
    /// Stable text key for a tuple of values, used to deduplicate groups.
    pub fn canonical_tuple(vals: &[Value]) -> String {
        let normalized: Vec<Value> = vals.iter().map(Self::normalize_number).collect();
        serde_json::to_string(&normalized).unwrap_or_default()
    }

    /// Hash key for an equi-join; nulls never join.
    pub fn join_key(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            other => Some(Self::canonical_tuple(std::slice::from_ref(other))),
        }
    }

    // NULLS LAST in both directions
    pub fn cmp_json_for_sort(a: &Value, b: &Value, ascending: bool) -> Ordering {
        use serde_json::Value::*;
        let directed = |ord: Ordering| if ascending { ord } else { ord.reverse() };
        match (a, b) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Greater,
            (_, Null) => Ordering::Less,
            (Bool(x), Bool(y)) => directed(x.cmp(y)),
            (Number(_), Number(_)) => directed(Self::cmp_values(a, b).unwrap_or(Ordering::Equal)),
            (String(x), String(y)) => directed(x.cmp(y)),
            (lhs, rhs) => directed(Self::type_rank(lhs).cmp(&Self::type_rank(rhs))),
        }
    }

    /// Ordering of two comparable scalars; `None` for nulls and mixed kinds.
    pub fn cmp_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
            },
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    fn normalize_number(value: &Value) -> Value {
        match value {
            Value::Number(n) if n.as_i64().is_none() => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
                _ => value.clone(),
            },
            _ => value.clone(),
        }
    }

    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Helpers;
    use serde_json::{json, Value};
    use std::cmp::Ordering::*;

    #[test]
    fn canonical_tuple_is_deterministic() {
        let a = vec![json!(1), json!("x"), json!(true)];
        let b = vec![json!(1), json!("x"), json!(true)];
        assert_eq!(Helpers::canonical_tuple(&a), Helpers::canonical_tuple(&b));
        assert_ne!(Helpers::canonical_tuple(&a), Helpers::canonical_tuple(&[json!(1), json!("y"), json!(true)]));
    }

    #[test]
    fn integral_floats_share_a_key_with_ints() {
        assert_eq!(Helpers::join_key(&json!(7)), Helpers::join_key(&json!(7.0)));
        assert_ne!(Helpers::join_key(&json!(7)), Helpers::join_key(&json!(7.5)));
        assert_eq!(Helpers::join_key(&Value::Null), None);
    }

    #[test]
    fn nulls_sort_last_both_ways() {
        let n = Value::Null;
        let z = json!(0);
        assert_eq!(Helpers::cmp_json_for_sort(&z, &n, true), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&n, &z, true), Greater);
        assert_eq!(Helpers::cmp_json_for_sort(&z, &n, false), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&n, &n, false), Equal);
    }

    #[test]
    fn numbers_and_strings_respect_direction() {
        assert_eq!(Helpers::cmp_json_for_sort(&json!(1.0), &json!(2), true), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!(1.0), &json!(2), false), Greater);
        assert_eq!(Helpers::cmp_json_for_sort(&json!("1-1"), &json!("1-2"), true), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!(true), &json!("s"), true), Less);
    }
}
