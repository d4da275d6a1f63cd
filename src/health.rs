//! Endpoint Registry & Health Table.
//!
//! One `EndpointHealth` per configured upstream URL, held in a `Vec` behind a
//! single `RwLock`. The lock is only ever held across synchronous field
//! updates, never across an `.await` on network I/O.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Three consecutive failures flips a healthy endpoint to unhealthy.
const UNHEALTHY_THRESHOLD: u32 = 3;
/// Bound on the latency ring per endpoint.
const LATENCY_WINDOW: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct EndpointHealth {
    pub url: String,
    pub is_healthy: bool,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub active_requests: i64,
    pub total_requests: u64,
    pub total_failures: u64,
    #[serde(skip)]
    pub latency_samples: VecDeque<u64>,
    pub average_response_time: f64,
}

impl EndpointHealth {
    fn new(url: String) -> Self {
        Self {
            url,
            is_healthy: true,
            consecutive_failures: 0,
            last_failure_at: None,
            active_requests: 0,
            total_requests: 0,
            total_failures: 0,
            latency_samples: VecDeque::with_capacity(LATENCY_WINDOW),
            average_response_time: 0.0,
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_requests as f64
        }
    }
}

/// The mutable map from upstream URL to health record, plus the shared
/// round-robin cursor used by the primary selector.
pub struct HealthTable {
    endpoints: RwLock<Vec<EndpointHealth>>,
    cursor: AtomicUsize,
}

impl HealthTable {
    pub fn new(urls: Vec<String>) -> Self {
        let endpoints = urls.into_iter().map(EndpointHealth::new).collect();
        Self { endpoints: RwLock::new(endpoints), cursor: AtomicUsize::new(0) }
    }

    pub async fn urls(&self) -> Vec<String> {
        self.endpoints.read().await.iter().map(|e| e.url.clone()).collect()
    }

    /// Records a successful dispatch: resets the failure streak, rehealthies
    /// the endpoint if it was down, and folds the latency sample in.
    pub async fn record_success(&self, url: &str, latency_ms: u64) {
        let mut eps = self.endpoints.write().await;
        if let Some(ep) = eps.iter_mut().find(|e| e.url == url) {
            ep.total_requests += 1;
            ep.consecutive_failures = 0;
            if ep.latency_samples.len() >= LATENCY_WINDOW {
                ep.latency_samples.pop_front();
            }
            ep.latency_samples.push_back(latency_ms);
            let sum: u64 = ep.latency_samples.iter().sum();
            ep.average_response_time = sum as f64 / ep.latency_samples.len() as f64;
            if !ep.is_healthy {
                ep.is_healthy = true;
            }
        }
    }

    /// Records a failed dispatch, flipping the endpoint unhealthy once its
    /// consecutive-failure streak crosses the threshold.
    pub async fn record_failure(&self, url: &str) {
        let mut eps = self.endpoints.write().await;
        if let Some(ep) = eps.iter_mut().find(|e| e.url == url) {
            ep.total_requests += 1;
            ep.total_failures += 1;
            ep.consecutive_failures += 1;
            ep.last_failure_at = Some(Utc::now());
            if ep.is_healthy && ep.consecutive_failures >= UNHEALTHY_THRESHOLD {
                ep.is_healthy = false;
            }
        }
    }

    /// `beginDispatch(url)` — called before the network send.
    pub async fn begin_dispatch(&self, url: &str) {
        let mut eps = self.endpoints.write().await;
        if let Some(ep) = eps.iter_mut().find(|e| e.url == url) {
            ep.active_requests += 1;
        }
    }

    /// `endDispatch(url)` — called unconditionally on every dispatch exit path.
    pub async fn end_dispatch(&self, url: &str) {
        let mut eps = self.endpoints.write().await;
        if let Some(ep) = eps.iter_mut().find(|e| e.url == url) {
            ep.active_requests = (ep.active_requests - 1).max(0);
        }
    }

    /// `forceHealthy(url)` — used by the recovery scanner.
    pub async fn force_healthy(&self, url: &str) {
        let mut eps = self.endpoints.write().await;
        if let Some(ep) = eps.iter_mut().find(|e| e.url == url) {
            ep.consecutive_failures = 0;
            ep.is_healthy = true;
        }
    }

    pub async fn snapshot(&self) -> Vec<EndpointHealth> {
        self.endpoints.read().await.clone()
    }

    pub async fn unhealthy_urls_older_than(&self, older_than: DateTime<Utc>) -> Vec<String> {
        self.endpoints
            .read()
            .await
            .iter()
            .filter(|e| !e.is_healthy)
            .filter(|e| e.last_failure_at.map(|t| t < older_than).unwrap_or(true))
            .map(|e| e.url.clone())
            .collect()
    }

    /// Advance the cursor exactly once and return the new starting index,
    /// modulo `len`. Returns `None` when there are no configured endpoints.
    pub(crate) async fn advance_cursor(&self) -> Option<(usize, usize)> {
        let len = self.endpoints.read().await.len();
        if len == 0 {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
        Some((start, len))
    }

    pub(crate) async fn with_endpoints<R>(&self, f: impl FnOnce(&[EndpointHealth]) -> R) -> R {
        let eps = self.endpoints.read().await;
        f(&eps)
    }

    /// Current cursor value without advancing it, for status reporting.
    pub fn current_cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}
