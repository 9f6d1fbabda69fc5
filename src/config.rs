//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Which remote tier implementation backs the cache engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Redis through a connection pool
    Redis,
    /// In-process emulation of the Redis contract
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Where cache misses are served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSourceKind {
    /// Elasticsearch `trade_order` index
    Elastic,
    /// JSON fixture file loaded at startup
    Static,
}

impl FromStr for OrderSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "elastic" => Ok(OrderSourceKind::Elastic),
            "static" => Ok(OrderSourceKind::Static),
            other => Err(format!("unknown order source '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,
    /// Remote tier implementation
    pub cache_backend: CacheBackend,
    /// Redis connection URL
    pub redis_url: String,
    /// Maximum pooled Redis connections
    pub redis_pool_size: usize,
    /// Sweeper interval in seconds
    pub sweep_interval: u64,
    /// TTL in seconds for cached order pages
    pub order_cache_ttl: u64,
    /// Backing store for cache misses
    pub order_source: OrderSourceKind,
    /// Elasticsearch base URLs, tried in order
    pub es_addresses: Vec<String>,
    /// Elasticsearch index holding orders
    pub es_index: String,
    pub es_user: Option<String>,
    pub es_password: Option<String>,
    /// Fixture path used by the static order source
    pub order_fixture: String,
    /// Emit JSON log lines instead of the pretty format
    pub log_json: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_HOST` - Bind address (default: 0.0.0.0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_URL` - Redis URL (default: redis://127.0.0.1:6379/0)
    /// - `REDIS_POOL_SIZE` - Pool size (default: 16)
    /// - `SWEEP_INTERVAL` - Sweeper frequency in seconds (default: 30)
    /// - `ORDER_CACHE_TTL` - Cached page lifetime in seconds (default: 3600)
    /// - `ORDER_SOURCE` - `elastic` or `static` (default: elastic)
    /// - `ES_ADDRESS` - Comma separated Elasticsearch URLs
    /// - `ES_INDEX` - Order index name (default: trade_order)
    /// - `ES_USER` / `ES_PASSWORD` - Optional basic auth
    /// - `ORDER_FIXTURE` - JSON fixture for the static source (default: orders.json)
    /// - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.cache_backend),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            redis_pool_size: parse_var("REDIS_POOL_SIZE").unwrap_or(defaults.redis_pool_size),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            order_cache_ttl: parse_var("ORDER_CACHE_TTL").unwrap_or(defaults.order_cache_ttl),
            order_source: parse_var("ORDER_SOURCE").unwrap_or(defaults.order_source),
            es_addresses: env::var("ES_ADDRESS")
                .ok()
                .map(|v| split_addresses(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.es_addresses),
            es_index: env::var("ES_INDEX").unwrap_or(defaults.es_index),
            es_user: env::var("ES_USER").ok().filter(|v| !v.is_empty()),
            es_password: env::var("ES_PASSWORD").ok().filter(|v| !v.is_empty()),
            order_fixture: env::var("ORDER_FIXTURE").unwrap_or(defaults.order_fixture),
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            cache_backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            redis_pool_size: 16,
            sweep_interval: 30,
            order_cache_ttl: 3600,
            order_source: OrderSourceKind::Elastic,
            es_addresses: vec!["http://127.0.0.1:9200".to_string()],
            es_index: "trade_order".to_string(),
            es_user: None,
            es_password: None,
            order_fixture: "orders.json".to_string(),
            log_json: false,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}
