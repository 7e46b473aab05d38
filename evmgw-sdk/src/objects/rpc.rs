//! JSON-RPC 2.0 envelopes used on the gateway transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::subscription::SubscriptionId;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method name of server-initiated subscription pushes.
pub const SUBSCRIPTION_METHOD: &str = "eth_subscription";

/// Well-known JSON-RPC error codes.
pub struct RpcErrorCode;

impl RpcErrorCode {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    /// Also used for "notifications not supported", matching geth.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Generic server-side failure, e.g. a failed execution.
    pub const SERVER_ERROR: i64 = -32000;
    /// `eth_call` / `eth_estimateGas` reverted.
    pub const EXECUTION_REVERTED: i64 = 3;
}

/// A client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Value::from(id),
            method: method.into(),
            params,
        }
    }
}

/// Error member of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// A response to an [`RpcRequest`]. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Server push for an active subscription:
///
/// ```json
/// {"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0x..","result":{ ... }}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionNotification<T = Value> {
    pub jsonrpc: String,
    pub method: String,
    pub params: SubscriptionParams<T>,
}

/// `params` member of a [`SubscriptionNotification`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionParams<T = Value> {
    pub subscription: SubscriptionId,
    pub result: T,
}

impl<T> SubscriptionNotification<T> {
    pub fn new(subscription: SubscriptionId, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: SUBSCRIPTION_METHOD.to_string(),
            params: SubscriptionParams {
                subscription,
                result,
            },
        }
    }
}
