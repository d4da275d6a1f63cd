//! Recovery Scanner — periodic background probe of unhealthy endpoints.
//!
//! Spawned as a detached `tokio::spawn` loop; allowed to die with the process
//! on shutdown rather than being explicitly joined, so in-flight probes may
//! be abandoned when the server stops.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{info, warn};

use crate::classifier::{classify, ErrorClass};
use crate::health::HealthTable;

/// How often the scanner wakes up to look for candidates.
const SCAN_INTERVAL: Duration = Duration::from_secs(30);
/// An unhealthy endpoint is only probed once it has been quiescent this long.
const QUIESCENCE: chrono::Duration = chrono::Duration::seconds(60);
/// Deadline for the probe request itself.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(table: Arc<HealthTable>, client: Client) {
    let mut ticker = tokio::time::interval(SCAN_INTERVAL);
    loop {
        ticker.tick().await;
        scan_once(&table, &client).await;
    }
}

async fn scan_once(table: &HealthTable, client: &Client) {
    let cutoff = Utc::now() - QUIESCENCE;
    let candidates = table.unhealthy_urls_older_than(cutoff).await;
    for url in candidates {
        if probe(client, &url).await {
            info!(url, "recovery scanner: endpoint recovered");
            table.force_healthy(&url).await;
        }
    }
}

/// Probe one endpoint with a minimal `eth_blockNumber` call. Returns `true`
/// if the endpoint should be forced healthy.
async fn probe(client: &Client, url: &str) -> bool {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "eth_blockNumber",
        "params": [],
        "id": 1,
    });

    let send = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(&body)
        .send();

    let resp = match tokio::time::timeout(PROBE_TIMEOUT, send).await {
        Ok(Ok(resp)) if resp.status().is_success() => resp,
        Ok(Ok(resp)) => {
            warn!(url, status = %resp.status(), "recovery probe: non-2xx");
            return false;
        }
        Ok(Err(e)) => {
            warn!(url, error = %e, "recovery probe: transport failure");
            return false;
        }
        Err(_) => {
            warn!(url, "recovery probe: timed out");
            return false;
        }
    };

    let body: serde_json::Value = match resp.json().await {
        Ok(v) => v,
        Err(_) => return false,
    };

    match body.get("error") {
        None => true,
        Some(err) => classify(err) != ErrorClass::EndpointFailure,
    }
}
