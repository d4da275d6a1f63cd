//! Error Classifier — pure function from an upstream error value to a label.
//!
//! Ordering matters: normal-RPC patterns are checked before endpoint-failure
//! patterns so that e.g. "gas limit" in an application error never gets
//! mistaken for a provider outage. Kept as plain ordered string tables per
//! the design note treating this as a configuration artifact, not logic.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    EndpointFailure,
    ApplicationRpcError,
}

/// Normal RPC-error patterns. Any match here wins regardless of later matches.
const APPLICATION_RPC_PATTERNS: &[&str] = &[
    "intrinsic gas",
    "insufficient funds",
    "nonce too low",
    "nonce too high",
    "transaction underpriced",
    "invalid argument",
    "execution reverted",
    "contract call exception",
    "invalid signature",
    "gas limit",
    "already known",
    "replacement transaction",
];

/// Provider / transport failure patterns.
const ENDPOINT_FAILURE_PATTERNS: &[&str] = &[
    "rate limit",
    "too many requests",
    "request limit exceeded",
    "throttle",
    "throttling",
    "429",
    "ru credits",
    "compute units",
    "quota exceeded",
    "insufficient credits",
    "econnrefused",
    "etimedout",
    "enotfound",
    "socket hang up",
    "network error",
    "connection refused",
    "connection reset",
    "connection closed",
    "timeout",
    "service unavailable",
    "503",
    "502",
    "gateway",
    "internal server error",
    "500",
];

/// Collapse a polymorphic upstream error value to a single searchable string.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("message") {
                return s.clone();
            }
            if let Some(data) = map.get("data") {
                return stringify(data);
            }
            value.to_string()
        }
        other => other.to_string(),
    }
}

/// Classify an error value as an endpoint failure or an application-level
/// RPC error, checking application patterns before endpoint patterns.
pub fn classify(value: &Value) -> ErrorClass {
    let text = stringify(value).to_lowercase();

    if APPLICATION_RPC_PATTERNS.iter().any(|p| text.contains(p)) {
        return ErrorClass::ApplicationRpcError;
    }
    if ENDPOINT_FAILURE_PATTERNS.iter().any(|p| text.contains(p)) {
        return ErrorClass::EndpointFailure;
    }
    ErrorClass::ApplicationRpcError
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rate_limit_is_endpoint_failure() {
        assert_eq!(classify(&json!("rate limit exceeded")), ErrorClass::EndpointFailure);
    }

    #[test]
    fn execution_reverted_is_application_error() {
        assert_eq!(
            classify(&json!({"message": "execution reverted: insufficient balance"})),
            ErrorClass::ApplicationRpcError
        );
    }

    #[test]
    fn gas_limit_beats_conflicting_endpoint_pattern() {
        // "gas limit" contains no endpoint-failure substring, but this guards
        // the ordering contract: normal patterns are checked first regardless.
        assert_eq!(classify(&json!("gas limit reached for this block")), ErrorClass::ApplicationRpcError);
    }

    #[test]
    fn unknown_error_defaults_to_application_error() {
        assert_eq!(classify(&json!("some totally novel failure mode")), ErrorClass::ApplicationRpcError);
    }

    #[test]
    fn structured_error_uses_message_field() {
        let v = json!({"code": -32000, "message": "ETIMEDOUT while connecting"});
        assert_eq!(classify(&v), ErrorClass::EndpointFailure);
    }

    #[test]
    fn structured_error_falls_back_to_data_field() {
        let v = json!({"data": "upstream returned 503 Service Unavailable"});
        assert_eq!(classify(&v), ErrorClass::EndpointFailure);
    }

    #[test]
    fn http_status_patterns_classify_as_endpoint_failure() {
        for s in ["429 Too Many Requests", "502 Bad Gateway", "500 Internal Server Error"] {
            assert_eq!(classify(&json!(s)), ErrorClass::EndpointFailure, "{s}");
        }
    }
}
