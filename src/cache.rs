//! Response Cache — bounded TTL cache of successful responses keyed by method+params.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::envelope::ResponseEnvelope;

/// Sweep is triggered once the table grows past this many entries.
const SWEEP_THRESHOLD: usize = 1000;

struct CacheEntry {
    response: ResponseEnvelope,
    inserted_at: Instant,
}

pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    enabled: bool,
}

/// Build the cache key `method + ":" + canonical(params)`. `serde_json::Value`
/// serializes object keys in insertion order, which is "canonical enough" here
/// since both sides of a comparison come from the same serde_json parse.
pub fn cache_key(method: &str, params: &serde_json::Value) -> String {
    format!("{method}:{params}")
}

impl ResponseCache {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl, enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled && !self.ttl.is_zero()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<ResponseEnvelope> {
        if !self.enabled() {
            return None;
        }
        let entries = self.entries.read().await;
        entries.get(key).and_then(|e| {
            if e.inserted_at.elapsed() < self.ttl {
                Some(e.response.clone())
            } else {
                None
            }
        })
    }

    pub async fn insert(&self, key: String, response: ResponseEnvelope) {
        if !self.enabled() {
            return;
        }
        let mut entries = self.entries.write().await;
        if entries.len() > SWEEP_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        }
        entries.insert(key, CacheEntry { response, inserted_at: Instant::now() });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
