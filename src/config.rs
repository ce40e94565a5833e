use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Search engine configuration
    pub search: SearchEngineConfig,

    /// Relational store configuration
    pub database: DatabaseConfig,

    /// Indexer pipeline configuration
    pub indexer: IndexerConfig,

    /// Dynamic-data enrichment configuration
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/local.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: CATALOG_SEARCH_)
            .add_source(
                config::Environment::with_prefix("CATALOG_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEngineConfig {
    /// Search engine base URL
    #[serde(default = "default_search_url")]
    pub base_url: String,

    /// Basic auth username (optional)
    pub username: Option<String>,

    /// Basic auth password (optional, never logged)
    pub password: Option<String>,

    /// Logical alias the query path reads through
    #[serde(default = "default_alias")]
    pub alias: String,

    /// Prefix for physical index names
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,

    /// Search request deadline (seconds)
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    /// Bulk upload deadline (seconds)
    #[serde(default = "default_bulk_timeout")]
    pub bulk_timeout_secs: u64,

    /// Health probe deadline (seconds)
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,

    /// Autocomplete secondary-path deadline (seconds)
    #[serde(default = "default_autocomplete_timeout")]
    pub autocomplete_timeout_secs: u64,

    /// Rescore window size for the second ranking pass
    #[serde(default = "default_rescore_window")]
    pub rescore_window: u32,

    /// Maximum accepted query length; longer input is truncated
    #[serde(default = "default_q_length_cap")]
    pub q_length_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// MySQL connection URL
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Pool acquire timeout (seconds)
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Rows per extraction page and bulk request
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Old physical indices kept after a successful cut-over
    #[serde(default = "default_max_old_indices")]
    pub max_old_indices: usize,

    /// Allowed |doc_count - processed| discrepancy after population (0 = strict)
    #[serde(default = "default_count_tolerance")]
    pub count_tolerance: u64,

    /// Index schema file; the embedded schema is used when unset
    pub schema_path: Option<PathBuf>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_old_indices: default_max_old_indices(),
            count_tolerance: default_count_tolerance(),
            schema_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnrichmentConfig {
    /// Dynamic-data provider endpoint; enrichment is a no-op when unset
    pub endpoint: Option<String>,

    /// Provider request timeout (seconds)
    #[serde(default = "default_enrichment_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_search_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_alias() -> String {
    "products_current".to_string()
}

fn default_index_prefix() -> String {
    "products".to_string()
}

fn default_search_timeout() -> u64 {
    20
}

fn default_bulk_timeout() -> u64 {
    60
}

fn default_health_timeout() -> u64 {
    5
}

fn default_autocomplete_timeout() -> u64 {
    3
}

fn default_rescore_window() -> u32 {
    50
}

fn default_q_length_cap() -> usize {
    200
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_batch_size() -> u32 {
    1000
}

fn default_max_old_indices() -> usize {
    2
}

fn default_count_tolerance() -> u64 {
    10
}

fn default_enrichment_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
