//! JSON-RPC 2.0 wire types.
//!
//! Deliberately minimal: the tool endpoint serves four methods, so this
//! module carries one request shape, one response shape, and only the
//! error codes the dispatcher can actually emit. Request ids are opaque
//! JSON values (string, number, or null) and are echoed back untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision advertised during initialize.
pub const MCP_VERSION: &str = "2025-03-26";

/// Fixed JSON-RPC version marker.
pub const JSONRPC_VERSION: &str = "2.0";

/// An incoming call. `params` stays raw JSON; each handler deserialises
/// its own parameter shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Id-less requests are notifications; the endpoint stays silent.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// An outgoing reply: exactly one of `result` or `error`, with the
/// caller's id echoed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// Fold a handler outcome into the reply for `id`.
    pub fn reply(id: Option<Value>, outcome: Result<Value, RpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(rpc_error) => (None, Some(rpc_error)),
        };
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
            error,
        }
    }
}

/// Error payload: a standard JSON-RPC 2.0 code plus human-readable detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    /// Body was not a JSON-RPC request at all.
    pub const PARSE_ERROR: i32 = -32700;
    /// Method name the endpoint does not serve.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Params present but not what the method or tool expects.
    pub const INVALID_PARAMS: i32 = -32602;
    /// The handler itself failed.
    pub const INTERNAL_ERROR: i32 = -32603;

    pub fn parse() -> Self {
        Self {
            code: Self::PARSE_ERROR,
            message: "Parse error".to_string(),
        }
    }

    pub fn unknown_method(method: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
        }
    }

    pub fn bad_params(detail: impl Into<String>) -> Self {
        Self {
            code: Self::INVALID_PARAMS,
            message: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            code: Self::INTERNAL_ERROR,
            message: detail.into(),
        }
    }
}
