//! Configuration — startup-time parsing of process environment into a
//! validated, immutable `ProxyConfig`. `clap` layers an optional CLI surface
//! over the same settings via `env = "..."` attributes alongside `--flag`
//! forms, without displacing env-var config.

use std::time::Duration;

use clap::Parser;

use crate::local_methods::ChainIdentity;

fn default_rpc_url() -> String {
    "https://ethereum-rpc.publicnode.com".to_string()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "rpc-proxy", about = "JSON-RPC reverse proxy for Ethereum-compatible RPC endpoints")]
pub struct ProxyConfig {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Comma-separated list of upstream RPC URLs, in priority/round-robin order.
    #[arg(long, env = "RPC_URLS", value_delimiter = ',')]
    pub rpc_urls: Vec<String>,

    /// Comma-separated list of allowed CORS origins, or "*" for any origin.
    #[arg(long, env = "CORS_ORIGINS", default_value = "*", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Maximum accepted request body size, in bytes.
    #[arg(long, env = "MAX_REQUEST_SIZE", default_value_t = 1_048_576)]
    pub max_request_size: usize,

    /// Per-attempt upstream deadline, in milliseconds.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 6_000)]
    pub request_timeout_ms: u64,

    /// Per-endpoint in-flight request cap.
    #[arg(long, env = "MAX_CONCURRENT_REQUESTS", default_value_t = 200)]
    pub max_concurrent_requests: i64,

    /// Enable the bounded TTL response cache.
    #[arg(long, env = "ENABLE_CACHE", default_value_t = false)]
    pub enable_cache: bool,

    /// Response cache TTL, in milliseconds.
    #[arg(long, env = "CACHE_TTL", default_value_t = 1_000)]
    pub cache_ttl_ms: u64,

    /// Maximum number of alternate-endpoint retries per client request.
    #[arg(long, env = "MAX_RETRY_ATTEMPTS", default_value_t = 2)]
    pub max_retry_attempts: usize,

    /// Chain id used for the `net_version` local shortcut.
    #[arg(long, env = "CHAIN_ID", default_value_t = 42_161)]
    pub chain_id: u64,

    /// Hex-encoded chain id used for the `eth_chainId` local shortcut.
    #[arg(long, env = "CHAIN_ID_HEX", default_value = "0xa4b1")]
    pub chain_id_hex: String,

    /// Emit structured JSON log lines instead of human-readable ones.
    #[arg(long, env = "ENABLE_JSON_LOGS", default_value_t = false)]
    pub enable_json_logs: bool,
}

impl ProxyConfig {
    /// Parse from `std::env`/CLI args, loading a `.env` file first if present.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::parse();
        config.rpc_urls.retain(|u| !u.trim().is_empty());
        if config.rpc_urls.is_empty() {
            config.rpc_urls = vec![default_rpc_url()];
        }
        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn chain_identity(&self) -> ChainIdentity {
        ChainIdentity::new(self.chain_id, self.chain_id_hex.clone())
    }

    pub fn cors_allows_all(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = ProxyConfig::parse_from(["rpc-proxy"]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_request_size, 1_048_576);
        assert_eq!(config.request_timeout_ms, 6_000);
        assert_eq!(config.max_concurrent_requests, 200);
        assert!(!config.enable_cache);
        assert_eq!(config.cache_ttl_ms, 1_000);
        assert_eq!(config.max_retry_attempts, 2);
        assert_eq!(config.chain_id, 42_161);
        assert_eq!(config.chain_id_hex, "0xa4b1");
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn cors_wildcard_is_detected() {
        let config = ProxyConfig::parse_from(["rpc-proxy"]);
        assert!(config.cors_allows_all());

        let config = ProxyConfig::parse_from(["rpc-proxy", "--cors-origins", "https://a.example"]);
        assert!(!config.cors_allows_all());
    }

    #[test]
    fn rpc_urls_parses_comma_separated_list() {
        let config = ProxyConfig::parse_from([
            "rpc-proxy",
            "--rpc-urls",
            "https://a.example,https://b.example",
        ]);
        assert_eq!(config.rpc_urls, vec!["https://a.example", "https://b.example"]);
    }
}
