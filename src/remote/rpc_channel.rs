use std::time::Duration;

use serde_json::Value;

use crate::QueryResult;

/// What came back from one call, with the transport time measured by the
/// channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcReply {
    pub body: Value,
    pub response_time: Duration,
}

/// Outbound request/response transport to a service exposing the same
/// query semantics. Implementations report unreachable services as
/// connectivity errors and never retry.
pub trait RpcChannel: Send + Sync {
    fn call(&self, route: &str, payload: &Value) -> QueryResult<RpcReply>;
}
