//! Retry Orchestrator — composes Selector + Dispatcher.
//!
//! One primary attempt, plus up to `max_retry_attempts` retries on alternate
//! endpoints, but only when the response carries an endpoint-failure error.
//! Application-RPC errors are never retried.

use crate::classifier::{classify, ErrorClass};
use crate::dispatcher::Dispatcher;
use crate::envelope::{RequestEnvelope, ResponseEnvelope, RpcErrorObject};
use crate::health::HealthTable;
use crate::metrics::Metrics;
use crate::selector::Selector;

pub struct RetryOrchestrator<'a> {
    pub selector: &'a Selector,
    pub dispatcher: &'a Dispatcher,
    pub max_retry_attempts: usize,
}

fn is_endpoint_failure(error: &RpcErrorObject) -> bool {
    // Transport-layer codes are always endpoint-failures without consulting
    // the classifier.
    if error.code == -32050 || error.code == -32603 {
        return true;
    }
    let value = serde_json::to_value(error).unwrap_or(serde_json::Value::Null);
    classify(&value) == ErrorClass::EndpointFailure
}

impl<'a> RetryOrchestrator<'a> {
    /// Returns `None` when there is no healthy (or fallback) endpoint to try at all.
    pub async fn run(
        &self,
        table: &HealthTable,
        metrics: &Metrics,
        request: &RequestEnvelope,
    ) -> Option<ResponseEnvelope> {
        let primary_url = self.selector.primary_pick(table).await?;
        let mut response = self.dispatcher.dispatch(table, metrics, request, &primary_url).await;

        if response.error.is_none() {
            return Some(response);
        }

        let should_retry = response
            .error
            .as_ref()
            .map(is_endpoint_failure)
            .unwrap_or(false);

        if should_retry && self.max_retry_attempts > 0 {
            let retry_urls = self
                .selector
                .retry_picks(table, &primary_url, self.max_retry_attempts)
                .await;

            for url in retry_urls {
                metrics.retries_total.inc();
                let r = self.dispatcher.dispatch(table, metrics, request, &url).await;
                if r.error.is_none() {
                    return Some(r);
                }
                response = r;
            }
        }

        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RpcId;
    use crate::metrics::Metrics;
    use serde_json::Value;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn req() -> RequestEnvelope {
        RequestEnvelope {
            jsonrpc: Some("2.0".to_string()),
            method: Some("eth_blockNumber".to_string()),
            params: Some(Value::Array(vec![])),
            id: RpcId::Number(1),
        }
    }

    #[tokio::test]
    async fn retries_on_endpoint_failure_and_succeeds_on_second_endpoint() {
        let bad = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32000, "message": "rate limit exceeded"}
            })))
            .mount(&bad)
            .await;

        let good = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": "0xabc"
            })))
            .mount(&good)
            .await;

        let table = HealthTable::new(vec![bad.uri(), good.uri()]);
        let selector = Selector::new(200);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let orchestrator = RetryOrchestrator { selector: &selector, dispatcher: &dispatcher, max_retry_attempts: 2 };

        let resp = orchestrator.run(&table, &Metrics::new(), &req()).await.unwrap();
        assert_eq!(resp.result, Some(Value::String("0xabc".to_string())));

        let snap = table.snapshot().await;
        let bad_health = snap.iter().find(|e| e.url == bad.uri()).unwrap();
        assert_eq!(bad_health.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn application_rpc_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": 3, "message": "execution reverted"}
            })))
            .mount(&server)
            .await;

        let other = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x1"
            })))
            .mount(&other)
            .await;

        let table = HealthTable::new(vec![server.uri(), other.uri()]);
        let selector = Selector::new(200);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let orchestrator = RetryOrchestrator { selector: &selector, dispatcher: &dispatcher, max_retry_attempts: 2 };

        let resp = orchestrator.run(&table, &Metrics::new(), &req()).await.unwrap();
        // Must see the original application error, not a retried success.
        assert!(resp.is_error());
        assert_eq!(resp.error.unwrap().message, "execution reverted");
    }

    #[tokio::test]
    async fn retry_bound_is_at_most_one_plus_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32000, "message": "ETIMEDOUT"}
            })))
            .mount(&server)
            .await;

        // Single endpoint: primary attempt + zero retry targets available,
        // so exactly one dispatch happens regardless of max_retry_attempts.
        let table = HealthTable::new(vec![server.uri()]);
        let selector = Selector::new(200);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let orchestrator = RetryOrchestrator { selector: &selector, dispatcher: &dispatcher, max_retry_attempts: 2 };

        orchestrator.run(&table, &Metrics::new(), &req()).await.unwrap();
        assert_eq!(table.snapshot().await[0].total_requests, 1);
    }

    #[tokio::test]
    async fn no_endpoints_returns_none() {
        let table = HealthTable::new(vec![]);
        let selector = Selector::new(200);
        let dispatcher = Dispatcher::new(Duration::from_secs(2));
        let orchestrator = RetryOrchestrator { selector: &selector, dispatcher: &dispatcher, max_retry_attempts: 2 };
        assert!(orchestrator.run(&table, &Metrics::new(), &req()).await.is_none());
    }
}
