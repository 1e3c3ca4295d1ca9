use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    catalog::ReturnType,
    config::{Mode, QueryConfig},
    executor::{FetchStrategy, ResultSet, Row, RunOptions},
    planner::{QueryRequest, SortOrder},
    remote::RpcChannel,
    QueryError, QueryResult,
};

pub const QUERY_ROUTE: &str = "querycubes";

/// Payload of a remote query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteRequest {
    pub searchfilter: Option<String>,
    /// return parameters, comma separated
    pub params: String,
    pub returntype: Option<ReturnType>,
    pub release: String,
    pub limit: u64,
    pub return_all: bool,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub query_type: FetchStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    pub order: String,
}

impl RemoteRequest {
    pub fn new(request: &QueryRequest, options: &RunOptions, config: &QueryConfig) -> Self {
        Self {
            searchfilter: request.filter_text().map(str::to_string),
            params: request.return_params.join(","),
            returntype: request.return_type,
            release: config.release.clone(),
            limit: config.limit,
            return_all: options.return_all,
            start: options.start,
            end: options.end,
            query_type: options.strategy,
            sort: request.sort.clone(),
            order: match request.order {
                SortOrder::Asc => "asc".to_string(),
                SortOrder::Desc => "desc".to_string(),
            },
        }
    }
}

/// Decoded reply of a remote query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteResponse {
    /// field order of every data row
    pub queryparams_order: Vec<String>,
    pub params: Vec<String>,
    /// compiled SQL, for display
    pub query: String,
    pub count: u64,
    pub chunk: u64,
    pub totalcount: u64,
    /// server-side seconds
    pub runtime: f64,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

/// Runs requests through an [`RpcChannel`] and decodes the reply into the
/// same [`ResultSet`] a local run produces.
pub struct RemoteAdapter<'a> {
    channel: &'a dyn RpcChannel,
    config: &'a QueryConfig,
}

impl<'a> RemoteAdapter<'a> {
    pub fn new(channel: &'a dyn RpcChannel, config: &'a QueryConfig) -> Self {
        Self { channel, config }
    }

    pub fn run(&self, request: &QueryRequest, options: &RunOptions) -> QueryResult<ResultSet> {
        let mut warnings = Vec::new();
        if options.return_all {
            let message = "Attempting to return all results. This may take a while or crash.".to_string();
            warn!("{message}");
            warnings.push(message);
        }

        let payload = serde_json::to_value(RemoteRequest::new(request, options, self.config))
            .map_err(|e| QueryError::usage(format!("cannot encode remote request: {e}")))?;
        let reply = self.channel.call(QUERY_ROUTE, &payload).map_err(|e| match e {
            QueryError::Connectivity(_) => e,
            other => QueryError::connectivity(format!("API query call failed: {other}")),
        })?;

        let response: RemoteResponse = serde_json::from_value(reply.body)
            .map_err(|e| QueryError::connectivity(format!("unreadable API query response: {e}")))?;
        if let Some(row) = response.data.iter().find(|r| r.len() != response.queryparams_order.len()) {
            return Err(QueryError::connectivity(format!(
                "API query response row has {} values for {} fields",
                row.len(),
                response.queryparams_order.len()
            )));
        }
        debug!(params = ?response.params, total = response.totalcount, "remote query answered");

        Ok(ResultSet {
            rows: response.data.iter().map(|r| Row::from_values(r)).collect(),
            columns: response.queryparams_order,
            sql: response.query,
            mode: Mode::Remote,
            count: response.count,
            total_count: response.totalcount,
            chunk: response.chunk,
            runtime: Duration::try_from_secs_f64(response.runtime).unwrap_or_default(),
            response_time: Some(reply.response_time),
            start: options.start,
            end: options.end,
            warnings,
            return_type: request.return_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::remote::RpcReply;

    struct Canned {
        reply: QueryResult<Value>,
        seen: Mutex<Vec<(String, Value)>>,
    }

    impl Canned {
        fn new(reply: QueryResult<Value>) -> Self {
            Self { reply, seen: Mutex::new(vec![]) }
        }
    }

    impl RpcChannel for Canned {
        fn call(&self, route: &str, payload: &Value) -> QueryResult<RpcReply> {
            self.seen.lock().unwrap().push((route.to_string(), payload.clone()));
            self.reply.clone().map(|body| RpcReply { body, response_time: Duration::from_millis(40) })
        }
    }

    fn body() -> Value {
        json!({
            "queryparams_order": ["cube.mangaid", "cube.plateifu", "nsa.z"],
            "params": ["cube.mangaid", "cube.plateifu", "nsa.z"],
            "query": "SELECT cube.mangaid, cube.plateifu, nsa.z FROM mangadatadb.cube ...",
            "count": 2,
            "chunk": 100,
            "totalcount": 2,
            "runtime": 0.25,
            "data": [["1-209232", "8485-1901", 0.0407], ["1-24246", "8486-1901", 0.0301]]
        })
    }

    fn request() -> QueryRequest {
        QueryRequest::new().with_filter("nsa.z < 0.1").with_return_params(&["nsa.z", "cube.ra"])
    }

    #[test]
    fn payload_carries_the_request() {
        let channel = Canned::new(Ok(body()));
        let config = QueryConfig::default();
        let options = RunOptions::new().with_window(Some(0), Some(10));
        RemoteAdapter::new(&channel, &config).run(&request(), &options).unwrap();

        let seen = channel.seen.lock().unwrap();
        let (route, payload) = &seen[0];
        assert_eq!(route, QUERY_ROUTE);
        assert_eq!(payload["searchfilter"], "nsa.z < 0.1");
        assert_eq!(payload["params"], "nsa.z,cube.ra");
        assert_eq!(payload["release"], "DR15");
        assert_eq!(payload["limit"], 100);
        assert_eq!(payload["return_all"], false);
        assert_eq!(payload["start"], 0);
        assert_eq!(payload["end"], 10);
        assert_eq!(payload["query_type"], "cursor");
    }

    #[test]
    fn decodes_into_result_set() {
        let channel = Canned::new(Ok(body()));
        let config = QueryConfig::default();
        let result = RemoteAdapter::new(&channel, &config).run(&request(), &RunOptions::new()).unwrap();

        assert_eq!(result.mode, Mode::Remote);
        assert_eq!(result.columns, ["cube.mangaid", "cube.plateifu", "nsa.z"]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.total_count, 2);
        assert_eq!(result.runtime, Duration::from_millis(250));
        assert_eq!(result.response_time, Some(Duration::from_millis(40)));
        assert!(result.sql.starts_with("SELECT"));
    }

    #[test]
    fn transport_and_decode_failures_are_connectivity() {
        let config = QueryConfig::default();

        let down = Canned::new(Err(QueryError::connectivity("connection refused")));
        let err = RemoteAdapter::new(&down, &config).run(&request(), &RunOptions::new()).unwrap_err();
        assert!(err.is_connectivity());

        let refused = Canned::new(Err(QueryError::usage("bad route")));
        let err = RemoteAdapter::new(&refused, &config).run(&request(), &RunOptions::new()).unwrap_err();
        assert!(err.is_connectivity());

        let garbage = Canned::new(Ok(json!({ "error": "internal" })));
        let err = RemoteAdapter::new(&garbage, &config).run(&request(), &RunOptions::new()).unwrap_err();
        assert!(err.is_connectivity());

        let mut short = body();
        short["data"] = json!([["1-209232"]]);
        let err = RemoteAdapter::new(&Canned::new(Ok(short)), &config).run(&request(), &RunOptions::new()).unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn return_all_warns() {
        let channel = Canned::new(Ok(body()));
        let config = QueryConfig::default();
        let result = RemoteAdapter::new(&channel, &config)
            .run(&request(), &RunOptions::new().with_return_all(true))
            .unwrap();
        assert_eq!(result.warnings.len(), 1);
    }
}
