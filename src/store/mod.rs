//! Relational source of truth
//!
//! The products table is authoritative. The indexer streams rows out of it
//! in ascending `product_id` order, and the query path falls back to it with
//! a reduced CASE-based ranking whenever the search engine is gated off.

mod mysql;

pub use mysql::MySqlProductStore;

use crate::error::Result;
use crate::models::ProductRow;
use async_trait::async_trait;

/// A fallback-search row with its CASE-derived relevance
#[derive(Debug, Clone)]
pub struct RankedRow {
    pub row: ProductRow,
    pub relevance: i64,
}

/// One page of relational fallback-search results
#[derive(Debug, Clone, Default)]
pub struct FallbackPage {
    pub rows: Vec<RankedRow>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// A fallback autocomplete candidate
#[derive(Debug, Clone)]
pub struct FallbackSuggestion {
    pub text: String,
    pub external_id: String,
    pub score: i64,
}

/// Abstract interface to the relational store
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Count of rows with a positive `product_id`.
    async fn total_products(&self) -> Result<u64>;

    /// One extraction page: rows with `product_id > after_id`, ascending,
    /// at most `limit` of them, with brand/series names joined in.
    /// An empty page terminates the stream.
    async fn fetch_page(&self, after_id: i64, limit: u32) -> Result<Vec<ProductRow>>;

    /// SQL fallback search with the reduced CASE ranking.
    async fn fallback_search(&self, q: &str, page: u32, limit: u32) -> Result<FallbackPage>;

    /// SQL fallback autocomplete using prefix, contains and phonetic tiers.
    async fn fallback_autocomplete(&self, q: &str, limit: u32)
        -> Result<Vec<FallbackSuggestion>>;
}
