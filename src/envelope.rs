//! JSON-RPC 2.0 wire types.
//!
//! Field order matters: every response serializes as `jsonrpc, id, result|error`
//! because some client libraries parse the envelope positionally. `RequestEnvelope`
//! and `ResponseEnvelope` declare their fields in that order and rely on serde's
//! derive emitting struct fields in declaration order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC id: number, string, or null. Untagged so it round-trips verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
    Null,
}

impl RpcId {
    pub fn null() -> Self {
        RpcId::Null
    }
}

impl Default for RpcId {
    fn default() -> Self {
        RpcId::Null
    }
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcId::Number(n) => write!(f, "{n}"),
            RpcId::String(s) => write!(f, "{s}"),
            RpcId::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: Option<String>,
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: RpcId,
}

impl RequestEnvelope {
    /// Both `jsonrpc` and `method` must be present for a well-formed request.
    pub fn is_valid(&self) -> bool {
        self.jsonrpc.is_some() && self.method.is_some()
    }

    pub fn method_name(&self) -> &str {
        self.method.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn with_data(code: i64, message: impl Into<String>, data: impl Into<Value>) -> Self {
        Self { code, message: message.into(), data: Some(data.into()) }
    }
}

/// The response envelope. Field order (`jsonrpc`, `id`, `result`/`error`) is the
/// declaration order below — do not reorder these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub jsonrpc: String,
    pub id: RpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl ResponseEnvelope {
    pub fn success(id: RpcId, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    pub fn failure(id: RpcId, error: RpcErrorObject) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(error) }
    }

    pub fn parse_error() -> Self {
        Self::failure(RpcId::Null, RpcErrorObject::new(-32700, "Parse error"))
    }

    pub fn request_too_large() -> Self {
        Self::failure(RpcId::Null, RpcErrorObject::new(-32700, "Request too large"))
    }

    pub fn invalid_request(id: RpcId) -> Self {
        Self::failure(id, RpcErrorObject::new(-32600, "Invalid Request"))
    }

    pub fn method_not_allowed() -> Self {
        Self::failure(RpcId::Null, RpcErrorObject::new(-32601, "Method not allowed"))
    }

    pub fn upstream_timeout(id: RpcId, detail: impl Into<String>) -> Self {
        Self::failure(
            id,
            RpcErrorObject::with_data(-32050, "Request timeout", Value::String(detail.into())),
        )
    }

    pub fn internal_error(id: RpcId, detail: impl Into<String>) -> Self {
        Self::failure(
            id,
            RpcErrorObject::with_data(-32603, "Internal error", Value::String(detail.into())),
        )
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
