//! Observability — Prometheus counters for dispatch, retry and cache activity.

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};

pub struct Metrics {
    pub registry: Registry,
    pub requests_total: IntCounter,
    pub proxy_errors_total: IntCounter,
    pub rpc_errors_total: IntCounter,
    pub retries_total: IntCounter,
    pub cache_hits_total: IntCounter,
    pub cache_misses_total: IntCounter,
    pub dispatch_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total =
            IntCounter::with_opts(Opts::new("rpc_proxy_requests_total", "total client requests handled"))
                .unwrap();
        let proxy_errors_total = IntCounter::with_opts(Opts::new(
            "rpc_proxy_proxy_errors_total",
            "requests that failed due to an endpoint/transport error",
        ))
        .unwrap();
        let rpc_errors_total = IntCounter::with_opts(Opts::new(
            "rpc_proxy_rpc_errors_total",
            "requests that surfaced an application-level RPC error",
        ))
        .unwrap();
        let retries_total = IntCounter::with_opts(Opts::new(
            "rpc_proxy_retries_total",
            "alternate-endpoint retry attempts performed",
        ))
        .unwrap();
        let cache_hits_total =
            IntCounter::with_opts(Opts::new("rpc_proxy_cache_hits_total", "response cache hits")).unwrap();
        let cache_misses_total =
            IntCounter::with_opts(Opts::new("rpc_proxy_cache_misses_total", "response cache misses"))
                .unwrap();
        let dispatch_latency_ms = Histogram::with_opts(HistogramOpts::new(
            "rpc_proxy_dispatch_latency_ms",
            "upstream dispatch latency in milliseconds",
        ))
        .unwrap();

        registry.register(Box::new(requests_total.clone())).unwrap();
        registry.register(Box::new(proxy_errors_total.clone())).unwrap();
        registry.register(Box::new(rpc_errors_total.clone())).unwrap();
        registry.register(Box::new(retries_total.clone())).unwrap();
        registry.register(Box::new(cache_hits_total.clone())).unwrap();
        registry.register(Box::new(cache_misses_total.clone())).unwrap();
        registry.register(Box::new(dispatch_latency_ms.clone())).unwrap();

        Self {
            registry,
            requests_total,
            proxy_errors_total,
            rpc_errors_total,
            retries_total,
            cache_hits_total,
            cache_misses_total,
            dispatch_latency_ms,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
