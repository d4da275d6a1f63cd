//! GlobalStats — running counters over the process lifetime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

/// Time constant for the requests-per-second EMA.
const RPS_WINDOW_SECS: f64 = 10.0;

struct RpsTracker {
    ema: f64,
    last_event: Instant,
}

pub struct GlobalStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    rpc_errors: AtomicU64,
    proxy_errors: AtomicU64,
    started_at: Instant,
    rps: Mutex<RpsTracker>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rpc_errors: u64,
    pub proxy_errors: u64,
    pub requests_per_second: f64,
    pub uptime_secs: u64,
}

impl GlobalStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            rpc_errors: AtomicU64::new(0),
            proxy_errors: AtomicU64::new(0),
            started_at: Instant::now(),
            rps: Mutex::new(RpsTracker { ema: 0.0, last_event: Instant::now() }),
        }
    }

    fn record_event(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let mut tracker = self.rps.lock().unwrap();
        let now = Instant::now();
        let dt = now.duration_since(tracker.last_event).as_secs_f64().max(0.001);
        let instantaneous = 1.0 / dt;
        let alpha = 1.0 - (-dt / RPS_WINDOW_SECS).exp();
        tracker.ema += alpha * (instantaneous - tracker.ema);
        tracker.last_event = now;
    }

    /// A dispatch that the proxy successfully delivered, whether or not the
    /// payload itself was an application-RPC error.
    pub fn record_success(&self) {
        self.record_event();
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rpc_error(&self) {
        self.rpc_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A proxy/endpoint-level failure that the client ultimately saw as an error.
    pub fn record_proxy_failure(&self) {
        self.record_event();
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        self.proxy_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let rps = self.rps.lock().unwrap().ema;
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            rpc_errors: self.rpc_errors.load(Ordering::Relaxed),
            proxy_errors: self.proxy_errors.load(Ordering::Relaxed),
            requests_per_second: rps,
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self::new()
    }
}
