//! Application state and configuration.

use std::sync::Arc;
use std::time::Duration;

use postboard_store::{ClickHouseConfig, ClickHouseStore, Store, StoreTimeouts};

use crate::cache::{new_cache, ResponseCache, DEFAULT_TTL};
use crate::query::QueryService;

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080").
    pub bind_addr: String,

    /// ClickHouse connection settings.
    pub clickhouse: ClickHouseConfig,

    /// TTL for cached `/tags` and `/languages` responses.
    pub cache_ttl: Duration,

    /// Metrics HTTP server port (0 disables).
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `POSTBOARD_BIND_ADDR`: Server bind address (default: "0.0.0.0:8080")
    /// - `CLICKHOUSE_URL`: ClickHouse URL (default: "http://localhost:8123")
    /// - `CLICKHOUSE_DATABASE`: Database name (default: "postboard")
    /// - `CLICKHOUSE_TABLE`: Table name (default: "posts")
    /// - `POSTBOARD_CACHE_TTL_SECS`: List cache TTL in seconds (default: 60)
    /// - `POSTBOARD_METRICS_PORT`: Metrics port (default: 0, disabled)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = ClickHouseConfig::default();

        let bind_addr = var("POSTBOARD_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let clickhouse = ClickHouseConfig {
            url: var("CLICKHOUSE_URL").unwrap_or(defaults.url),
            database: var("CLICKHOUSE_DATABASE").unwrap_or(defaults.database),
            table: var("CLICKHOUSE_TABLE").unwrap_or(defaults.table),
        };

        let cache_ttl = match var("POSTBOARD_CACHE_TTL_SECS") {
            Some(secs) => Duration::from_secs(secs.trim().parse().map_err(|_| {
                anyhow::anyhow!("POSTBOARD_CACHE_TTL_SECS must be a whole number of seconds")
            })?),
            None => DEFAULT_TTL,
        };

        let metrics_port = match var("POSTBOARD_METRICS_PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("POSTBOARD_METRICS_PORT must be a port number"))?,
            None => 0,
        };

        tracing::info!(
            bind_addr = %bind_addr,
            clickhouse_url = %clickhouse.url,
            database = %clickhouse.database,
            table = %clickhouse.table,
            cache_ttl = ?cache_ttl,
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            clickhouse,
            cache_ttl,
            metrics_port,
        })
    }
}

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Query service over the shared store handle.
    pub query: QueryService,

    /// Response cache for the distinct-value lists.
    pub cache: ResponseCache,

    /// Application configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new application state backed by ClickHouse.
    pub fn new(config: Config) -> Self {
        let store = Store::new(
            Arc::new(ClickHouseStore::new(config.clickhouse.clone())),
            StoreTimeouts::default(),
        );
        Self::with_store(config, store)
    }

    /// Create application state over an existing store handle.
    pub fn with_store(config: Config, store: Store) -> Self {
        Self {
            query: QueryService::new(store),
            cache: new_cache(config.cache_ttl),
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.clickhouse.url, "http://localhost:8123");
        assert_eq!(config.clickhouse.database, "postboard");
        assert_eq!(config.clickhouse.table, "posts");
        assert_eq!(config.cache_ttl, DEFAULT_TTL);
        assert_eq!(config.metrics_port, 0);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("POSTBOARD_BIND_ADDR", "127.0.0.1:3000"),
            ("CLICKHOUSE_URL", "http://clickhouse:8123"),
            ("CLICKHOUSE_TABLE", "announcements"),
            ("POSTBOARD_CACHE_TTL_SECS", "5"),
            ("CLICKHOUSE_DATABASE", "  "),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.clickhouse.url, "http://clickhouse:8123");
        assert_eq!(config.clickhouse.database, "postboard");
        assert_eq!(config.clickhouse.table, "announcements");
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_ttl_is_rejected() {
        let err = Config::from_lookup(lookup(&[("POSTBOARD_CACHE_TTL_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("POSTBOARD_CACHE_TTL_SECS"));
    }
}
