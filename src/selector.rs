//! Selector — primary round-robin pick and retry-pick forward walk.

use crate::health::HealthTable;

#[derive(Debug, Clone, Copy)]
pub struct Selector {
    max_concurrent: i64,
}

impl Selector {
    pub fn new(max_concurrent: i64) -> Self {
        Self { max_concurrent }
    }

    /// Advance the shared cursor exactly once, then scan forward for the
    /// first healthy, under-capacity endpoint. Falls back to the
    /// least-loaded endpoint (ignoring health) if none qualify.
    pub async fn primary_pick(&self, table: &HealthTable) -> Option<String> {
        let (start, len) = table.advance_cursor().await?;
        table
            .with_endpoints(|eps| {
                for offset in 0..len {
                    let idx = (start + offset) % len;
                    let ep = &eps[idx];
                    if ep.is_healthy && ep.active_requests < self.max_concurrent {
                        return Some(ep.url.clone());
                    }
                }
                eps.iter().min_by_key(|e| e.active_requests).map(|e| e.url.clone())
            })
            .await
    }

    /// Starting just after `failed_url` in configured order, walk forward
    /// (with wrap) collecting up to `n` healthy, under-capacity alternatives.
    /// Never advances the primary cursor.
    pub async fn retry_picks(&self, table: &HealthTable, failed_url: &str, n: usize) -> Vec<String> {
        table
            .with_endpoints(|eps| {
                let len = eps.len();
                if len == 0 || n == 0 {
                    return Vec::new();
                }
                let failed_idx = eps.iter().position(|e| e.url == failed_url).unwrap_or(0);
                let mut out = Vec::with_capacity(n);
                for offset in 1..=len {
                    if out.len() >= n {
                        break;
                    }
                    let idx = (failed_idx + offset) % len;
                    let ep = &eps[idx];
                    if ep.url != failed_url && ep.is_healthy && ep.active_requests < self.max_concurrent {
                        out.push(ep.url.clone());
                    }
                }
                out
            })
            .await
    }
}
