use std::{fmt, str::FromStr};

use serde_json::Value;

use crate::{catalog::ReturnType, QueryError, QueryResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(QueryError::usage(format!("sort order must be 'asc' or 'desc', got '{other}'"))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

/// What the caller asks for: a filter, extra output fields and a return type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub search_filter: Option<String>,
    pub return_params: Vec<String>,
    pub return_type: Option<ReturnType>,
    /// extra default fields merged with the return type's defaults
    pub default_params: Vec<String>,
    /// pinned anchor table, local execution only
    pub anchor: Option<String>,
    pub sort: Option<String>,
    pub order: SortOrder,
    pub return_all: bool,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: &str) -> Self { self.search_filter = Some(filter.to_string()); self }
    pub fn with_return_params(mut self, params: &[&str]) -> Self {
        self.return_params = params.iter().map(|p| p.to_string()).collect();
        self
    }
    pub fn with_return_type(mut self, return_type: ReturnType) -> Self { self.return_type = Some(return_type); self }
    pub fn with_default_params(mut self, params: &[&str]) -> Self {
        self.default_params = params.iter().map(|p| p.to_string()).collect();
        self
    }
    pub fn with_anchor(mut self, table: &str) -> Self { self.anchor = Some(table.to_string()); self }
    pub fn with_sort(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some(field.to_string());
        self.order = order;
        self
    }
    pub fn with_return_all(mut self) -> Self { self.return_all = true; self }

    /// The filter text, `None` when absent or blank.
    pub fn filter_text(&self) -> Option<&str> {
        self.search_filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }

    /// Build a request from a JSON object, as received from an outer layer.
    ///
    /// ```json
    /// {"searchfilter": "nsa.z < 0.1", "returnparams": ["cube.ra"], "returntype": "cube",
    ///  "sort": "cube.mangaid", "order": "desc", "return_all": false}
    /// ```
    pub fn from_json(value: &Value) -> QueryResult<Self> {
        let Some(object) = value.as_object() else {
            return Err(QueryError::usage("query request must be a JSON object"));
        };

        let mut request = QueryRequest::new();
        request.search_filter = filter_from_json(object.get("searchfilter").unwrap_or(&Value::Null))?;
        request.return_params = string_list(object.get("returnparams"), "returnparams")?;
        request.default_params = string_list(object.get("defaultparams"), "defaultparams")?;

        if let Some(rt) = object.get("returntype").filter(|v| !v.is_null()) {
            let text = rt.as_str().ok_or_else(|| QueryError::usage("returntype must be a string"))?;
            request.return_type = Some(ReturnType::try_from(text)?);
        }
        if let Some(anchor) = object.get("anchor").and_then(Value::as_str) {
            request.anchor = Some(anchor.to_string());
        }
        if let Some(sort) = object.get("sort").and_then(Value::as_str) {
            request.sort = Some(sort.to_string());
        }
        if let Some(order) = object.get("order").filter(|v| !v.is_null()) {
            let text = order.as_str().ok_or_else(|| QueryError::usage("order must be a string"))?;
            request.order = text.parse()?;
        }
        request.return_all = object.get("return_all").and_then(Value::as_bool).unwrap_or(false);

        Ok(request)
    }
}

/// The search filter of a request payload; only strings and null are accepted.
pub fn filter_from_json(value: &Value) -> QueryResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(QueryError::usage(format!("search filter must be a string, got {other}"))),
    }
}

fn string_list(value: Option<&Value>, name: &str) -> QueryResult<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(vec![]),
        Some(Value::String(s)) => Ok(s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| QueryError::usage(format!("{name} entries must be strings")))
            })
            .collect(),
        Some(_) => Err(QueryError::usage(format!("{name} must be a list of strings"))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn order_tokens() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!(matches!("down".parse::<SortOrder>(), Err(QueryError::Usage(_))));
    }

    #[test]
    fn from_json_object() {
        let request = QueryRequest::from_json(&json!({
            "searchfilter": "nsa.z < 0.1",
            "returnparams": "cube.ra, cube.dec",
            "returntype": "Spaxel",
            "order": "desc",
            "return_all": true,
        }))
        .unwrap();

        assert_eq!(request.filter_text(), Some("nsa.z < 0.1"));
        assert_eq!(request.return_params, vec!["cube.ra", "cube.dec"]);
        assert_eq!(request.return_type, Some(ReturnType::Spaxel));
        assert_eq!(request.order, SortOrder::Desc);
        assert!(request.return_all);
    }

    #[test]
    fn non_string_filter_is_a_usage_error() {
        for filter in [json!(5), json!(["nsa.z < 1"]), json!({"a": 1}), json!(true)] {
            let err = QueryRequest::from_json(&json!({ "searchfilter": filter })).unwrap_err();
            assert!(matches!(err, QueryError::Usage(_)));
        }
        assert_eq!(filter_from_json(&Value::Null).unwrap(), None);
    }

    #[test]
    fn bad_return_type() {
        let err = QueryRequest::from_json(&json!({ "returntype": "galaxy" })).unwrap_err();
        assert!(matches!(err, QueryError::Usage(_)));
    }

    #[test]
    fn blank_filter_is_no_filter() {
        assert_eq!(QueryRequest::new().with_filter("   ").filter_text(), None);
    }
}
