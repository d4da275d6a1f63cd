//! Shared application state handed to every axum handler and to the
//! recovery scanner's background task.

use std::sync::Arc;

use reqwest::Client;

use crate::cache::ResponseCache;
use crate::config::ProxyConfig;
use crate::dispatcher::Dispatcher;
use crate::health::HealthTable;
use crate::local_methods::ChainIdentity;
use crate::metrics::Metrics;
use crate::selector::Selector;
use crate::stats::GlobalStats;

pub struct AppState {
    pub config: ProxyConfig,
    pub health: Arc<HealthTable>,
    pub selector: Selector,
    pub dispatcher: Dispatcher,
    pub cache: ResponseCache,
    pub stats: GlobalStats,
    pub metrics: Metrics,
    pub chain_identity: ChainIdentity,
    /// Plain client reused by the recovery scanner; dispatch has its own.
    pub probe_client: Client,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Arc<Self> {
        let health = Arc::new(HealthTable::new(config.rpc_urls.clone()));
        let selector = Selector::new(config.max_concurrent_requests);
        let dispatcher = Dispatcher::new(config.request_timeout());
        let cache = ResponseCache::new(config.enable_cache, config.cache_ttl());
        let chain_identity = config.chain_identity();
        let probe_client = Client::new();

        Arc::new(Self {
            config,
            health,
            selector,
            dispatcher,
            cache,
            stats: GlobalStats::new(),
            metrics: Metrics::new(),
            chain_identity,
            probe_client,
        })
    }
}
