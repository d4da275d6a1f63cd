//! Upstream Dispatcher — single-attempt forward to one upstream URL.
//!
//! Contract: `dispatch` never raises; it always returns a well-formed
//! `ResponseEnvelope`, updating the health table and incrementing/decrementing
//! `active_requests` on every exit path.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::classifier::{classify, ErrorClass};
use crate::envelope::{RequestEnvelope, ResponseEnvelope, RpcId};
use crate::health::HealthTable;
use crate::metrics::Metrics;

const USER_AGENT: &str = concat!("rpc-reverse-proxy/", env!("CARGO_PKG_VERSION"));

pub struct Dispatcher {
    client: Client,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout + Duration::from_secs(1))
            .build()
            .expect("failed to build HTTP client");
        Self { client, timeout }
    }

    /// Forward `request` to `url`. Never panics or propagates an error;
    /// always returns a normalized envelope and guarantees the
    /// `begin_dispatch`/`end_dispatch` pair around the attempt.
    pub async fn dispatch(
        &self,
        table: &HealthTable,
        metrics: &Metrics,
        request: &RequestEnvelope,
        url: &str,
    ) -> ResponseEnvelope {
        table.begin_dispatch(url).await;
        let response = self.attempt(table, metrics, request, url).await;
        table.end_dispatch(url).await;
        response
    }

    async fn attempt(
        &self,
        table: &HealthTable,
        metrics: &Metrics,
        request: &RequestEnvelope,
        url: &str,
    ) -> ResponseEnvelope {
        let t0 = Instant::now();
        let body = serde_json::json!({
            "jsonrpc": request.jsonrpc.as_deref().unwrap_or("2.0"),
            "method": request.method_name(),
            "params": request.params.clone().unwrap_or_else(|| Value::Array(vec![])),
            "id": request.id,
        });

        let send = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send();

        let outcome = tokio::time::timeout(self.timeout, send).await;

        let resp = match outcome {
            Err(_elapsed) => {
                table.record_failure(url).await;
                warn!(url, "upstream request timed out");
                return ResponseEnvelope::upstream_timeout(
                    request.id.clone(),
                    format!("deadline of {}ms elapsed", self.timeout.as_millis()),
                );
            }
            Ok(Err(e)) => {
                table.record_failure(url).await;
                warn!(url, error = %e, "upstream transport failure");
                return ResponseEnvelope::internal_error(request.id.clone(), e.to_string());
            }
            Ok(Ok(resp)) => resp,
        };

        if !resp.status().is_success() {
            let status = resp.status();
            table.record_failure(url).await;
            warn!(url, %status, "upstream returned non-2xx");
            return ResponseEnvelope::internal_error(
                request.id.clone(),
                format!("upstream HTTP {status}"),
            );
        }

        let parsed: Result<ResponseEnvelope, _> = resp.json().await;
        let mut envelope = match parsed {
            Ok(envelope) => envelope,
            Err(e) => {
                table.record_failure(url).await;
                warn!(url, error = %e, "upstream returned unparseable JSON");
                return ResponseEnvelope::internal_error(request.id.clone(), e.to_string());
            }
        };

        let latency_ms = t0.elapsed().as_millis() as u64;
        metrics.dispatch_latency_ms.observe(latency_ms as f64);

        match &envelope.error {
            Some(err) => {
                let err_value = serde_json::to_value(err).unwrap_or(Value::Null);
                match classify(&err_value) {
                    ErrorClass::EndpointFailure => table.record_failure(url).await,
                    ErrorClass::ApplicationRpcError => table.record_success(url, latency_ms).await,
                }
            }
            None => table.record_success(url, latency_ms).await,
        }

        envelope.jsonrpc = "2.0".to_string();
        envelope.id = request.id.clone();
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RpcId;
    use crate::metrics::Metrics;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn req(id: i64) -> RequestEnvelope {
        RequestEnvelope {
            jsonrpc: Some("2.0".to_string()),
            method: Some("eth_blockNumber".to_string()),
            params: Some(Value::Array(vec![])),
            id: RpcId::Number(id),
        }
    }

    #[tokio::test]
    async fn successful_dispatch_marks_endpoint_healthy_and_returns_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x10"
            })))
            .mount(&server)
            .await;

        let table = HealthTable::new(vec![server.uri()]);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let resp = dispatcher.dispatch(&table, &Metrics::new(), &req(1), &server.uri()).await;

        assert!(!resp.is_error());
        assert_eq!(resp.result, Some(Value::String("0x10".to_string())));
        let snap = table.snapshot().await;
        assert_eq!(snap[0].total_requests, 1);
        assert_eq!(snap[0].active_requests, 0);
        assert!(snap[0].average_response_time >= 0.0);
    }

    #[tokio::test]
    async fn non_2xx_records_failure_and_returns_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let table = HealthTable::new(vec![server.uri()]);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let resp = dispatcher.dispatch(&table, &Metrics::new(), &req(1), &server.uri()).await;

        assert!(resp.is_error());
        assert_eq!(resp.error.unwrap().code, -32603);
        assert_eq!(table.snapshot().await[0].total_failures, 1);
    }

    #[tokio::test]
    async fn endpoint_failure_error_in_200_body_records_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32000, "message": "rate limit exceeded"}
            })))
            .mount(&server)
            .await;

        let table = HealthTable::new(vec![server.uri()]);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let resp = dispatcher.dispatch(&table, &Metrics::new(), &req(1), &server.uri()).await;

        assert!(resp.is_error());
        assert_eq!(table.snapshot().await[0].total_failures, 1);
    }

    #[tokio::test]
    async fn application_rpc_error_in_200_body_counts_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": 3, "message": "execution reverted"}
            })))
            .mount(&server)
            .await;

        let table = HealthTable::new(vec![server.uri()]);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let resp = dispatcher.dispatch(&table, &Metrics::new(), &req(1), &server.uri()).await;

        assert!(resp.is_error());
        let snap = table.snapshot().await;
        assert_eq!(snap[0].total_failures, 0);
        assert!(snap[0].is_healthy);
    }

    #[tokio::test]
    async fn active_requests_balances_even_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let table = HealthTable::new(vec![server.uri()]);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        dispatcher.dispatch(&table, &Metrics::new(), &req(1), &server.uri()).await;
        assert_eq!(table.snapshot().await[0].active_requests, 0);
    }

    #[tokio::test]
    async fn response_id_is_normalized_to_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 999, "result": "0x1"
            })))
            .mount(&server)
            .await;

        let table = HealthTable::new(vec![server.uri()]);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let resp = dispatcher.dispatch(&table, &Metrics::new(), &req(7), &server.uri()).await;
        assert_eq!(resp.id, RpcId::Number(7));
    }
}
