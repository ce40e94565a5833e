//! Search engine abstraction
//!
//! Everything the indexer and query paths need from the search engine is
//! expressed through the [`SearchBackend`] trait: document bulk upload,
//! search, index administration, atomic alias rotation and cluster health.
//! Implementations can be swapped (HTTP cluster, in-memory mock) so the rest
//! of the system never talks to the engine directly.

mod opensearch;

pub use opensearch::OpenSearchBackend;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A single document headed for a bulk upload
#[derive(Debug, Clone)]
pub struct BulkDoc {
    /// Backend document id (the product id)
    pub id: i64,
    /// Serialized document body
    pub body: Value,
}

/// Per-item failure from a bulk upload
#[derive(Debug, Clone)]
pub struct BulkItemError {
    pub id: String,
    pub reason: String,
}

/// Outcome of one bulk request; partial failures are reported per item
/// rather than raised
#[derive(Debug, Clone, Default)]
pub struct BulkSummary {
    pub indexed: u64,
    pub item_errors: Vec<BulkItemError>,
}

/// One hit from a search response
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub source: Value,
    pub score: Option<f64>,
    pub highlight: Option<Value>,
}

/// A search response reduced to what the service consumes
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub total: u64,
    pub max_score: Option<f64>,
    pub suggest: Option<Value>,
}

/// Cluster status colours as the engine reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterStatus {
    Green,
    Yellow,
    Red,
}

impl ClusterStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "green" => ClusterStatus::Green,
            "yellow" => ClusterStatus::Yellow,
            _ => ClusterStatus::Red,
        }
    }

    /// Usable for serving reads
    pub fn is_operational(self) -> bool {
        matches!(self, ClusterStatus::Green | ClusterStatus::Yellow)
    }
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterStatus::Green => write!(f, "green"),
            ClusterStatus::Yellow => write!(f, "yellow"),
            ClusterStatus::Red => write!(f, "red"),
        }
    }
}

/// Cluster health probe result
#[derive(Debug, Clone)]
pub struct ClusterHealth {
    pub status: ClusterStatus,
    pub elapsed: Duration,
}

/// Document count for a physical index
#[derive(Debug, Clone, Copy)]
pub struct IndexStats {
    pub doc_count: u64,
}

/// One step of an atomic alias rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

/// Abstract interface to the search engine.
///
/// All implementations must be `Send + Sync`; every operation carries its own
/// deadline and maps transport failures into the application error taxonomy.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Upload documents in one bulk request. Idempotent per id; partial
    /// failures come back as `item_errors`.
    async fn bulk(&self, index: &str, docs: &[BulkDoc]) -> Result<BulkSummary>;

    /// Execute a search request body against an index or alias.
    async fn search(&self, index: &str, body: &Value) -> Result<SearchOutcome>;

    /// Create a physical index from a schema (settings + mappings).
    async fn create_index(&self, name: &str, schema: &Value) -> Result<()>;

    /// Delete a physical index.
    async fn delete_index(&self, name: &str) -> Result<()>;

    /// Whether a physical index exists.
    async fn index_exists(&self, name: &str) -> Result<bool>;

    /// Make recent writes visible to search.
    async fn refresh(&self, name: &str) -> Result<()>;

    /// Document count for an index.
    async fn stats(&self, name: &str) -> Result<IndexStats>;

    /// Apply a group of alias actions atomically: the whole group applies
    /// or none of it does.
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()>;

    /// Physical indices an alias currently resolves to (empty when absent).
    async fn get_alias(&self, alias: &str) -> Result<Vec<String>>;

    /// Physical index names matching a pattern such as `products_*`.
    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>>;

    /// Cluster (or index) health with the observed round-trip time.
    async fn cluster_health(
        &self,
        index: Option<&str>,
        timeout: Duration,
    ) -> Result<ClusterHealth>;

    /// Names of installed engine plugins.
    async fn plugins_installed(&self) -> Result<Vec<String>>;
}
