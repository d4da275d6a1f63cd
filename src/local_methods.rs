//! Local Method Shortcut — answers chain-identity methods without upstream contact.

use serde_json::Value;

use crate::envelope::{RequestEnvelope, ResponseEnvelope, RpcId};

#[derive(Debug, Clone)]
pub struct ChainIdentity {
    pub chain_id: u64,
    pub chain_id_hex: String,
}

impl ChainIdentity {
    pub fn new(chain_id: u64, chain_id_hex: impl Into<String>) -> Self {
        Self { chain_id, chain_id_hex: chain_id_hex.into() }
    }
}

impl Default for ChainIdentity {
    /// Arbitrum One (`"0xa4b1"` / `42161`).
    fn default() -> Self {
        Self { chain_id: 42_161, chain_id_hex: "0xa4b1".to_string() }
    }
}

/// Returns `Some(envelope)` if `request.method` is a chain-identity
/// short-circuit, `None` otherwise (caller should proceed to dispatch).
pub fn try_shortcut(identity: &ChainIdentity, request: &RequestEnvelope) -> Option<ResponseEnvelope> {
    match request.method_name() {
        "eth_chainId" => Some(ResponseEnvelope::success(
            request.id.clone(),
            Value::String(identity.chain_id_hex.clone()),
        )),
        "net_version" => Some(ResponseEnvelope::success(
            request.id.clone(),
            Value::String(identity.chain_id.to_string()),
        )),
        _ => None,
    }
}

/// A POST body of `{}` is a client-library probe handshake, answered with a
/// synthetic `eth_chainId` result under `id = 1`.
pub fn probe_response(identity: &ChainIdentity) -> ResponseEnvelope {
    ResponseEnvelope::success(RpcId::Number(1), Value::String(identity.chain_id_hex.clone()))
}
