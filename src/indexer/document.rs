//! Row-to-document transformation
//!
//! [`DocumentBuilder`] is a pure function from a raw product row to either an
//! indexable document or a counted skip. All text is normalized, numeric
//! fields are clamped, the completion-suggester payload is built with fixed
//! per-field weights, and empty fields are elided at serialization time.

use crate::models::{DocumentCounts, ProductDocument, ProductRow, SuggestEntry};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Map;

/// Suggest weights are part of the index contract and must survive
/// re-indexing unchanged.
pub const SUGGEST_WEIGHT_NAME: u32 = 100;
pub const SUGGEST_WEIGHT_EXTERNAL_ID: u32 = 95;
pub const SUGGEST_WEIGHT_SKU: u32 = 90;
pub const SUGGEST_WEIGHT_BRAND: u32 = 70;
pub const SUGGEST_WEIGHT_SERIES: u32 = 60;

/// Suggest inputs shorter than this are dropped
const MIN_SUGGEST_INPUT_CHARS: usize = 2;

/// Why a source row was not indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `product_id` is zero or negative
    NonPositiveId,
    /// All of name, external_id and sku are empty after normalization
    MissingIdentity,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NonPositiveId => write!(f, "non-positive product_id"),
            SkipReason::MissingIdentity => write!(f, "no name, external_id or sku"),
        }
    }
}

/// Builds indexable documents from raw rows
pub struct DocumentBuilder;

impl DocumentBuilder {
    /// Transform one row. `now` supplies the fallback for missing timestamps.
    pub fn build(row: &ProductRow, now: DateTime<Utc>) -> Result<ProductDocument, SkipReason> {
        if row.product_id <= 0 {
            return Err(SkipReason::NonPositiveId);
        }

        let name = normalize_text(&row.name);
        let external_id = normalize_text(&row.external_id);
        let sku = normalize_text(&row.sku);

        if name.is_empty() && external_id.is_empty() && sku.is_empty() {
            return Err(SkipReason::MissingIdentity);
        }

        let description = normalize_text(&row.description);
        let brand_name = normalize_text(&row.brand_name);
        let series_name = normalize_text(&row.series_name);

        let suggest = build_suggest(&name, &external_id, &sku, &brand_name, &series_name);
        let search_all = build_search_all(&[
            &name,
            &external_id,
            &sku,
            &brand_name,
            &series_name,
            &description,
        ]);

        Ok(ProductDocument {
            product_id: row.product_id,
            external_id,
            sku,
            name,
            description,
            brand_id: row.brand_id.max(0),
            brand_name,
            series_id: row.series_id.max(0),
            series_name,
            unit: normalize_text(&row.unit),
            dimensions: normalize_text(&row.dimensions),
            min_sale: row.min_sale.max(1),
            weight: row.weight.max(0.0),
            search_all,
            suggest,
            popularity_score: 0.0,
            in_stock: false,
            categories: Vec::new(),
            category_ids: Vec::new(),
            attributes: Map::new(),
            images: Vec::new(),
            documents: DocumentCounts::default(),
            created_at: coerce_timestamp(row.created_at.as_ref(), now),
            updated_at: coerce_timestamp(row.updated_at.as_ref(), now),
        })
    }
}

/// Strip control characters (tab, newline and carriage return survive as
/// whitespace), collapse whitespace runs to single spaces and trim.
pub fn normalize_text(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn build_suggest(
    name: &str,
    external_id: &str,
    sku: &str,
    brand_name: &str,
    series_name: &str,
) -> Vec<SuggestEntry> {
    let candidates = [
        (name, SUGGEST_WEIGHT_NAME),
        (external_id, SUGGEST_WEIGHT_EXTERNAL_ID),
        (sku, SUGGEST_WEIGHT_SKU),
        (brand_name, SUGGEST_WEIGHT_BRAND),
        (series_name, SUGGEST_WEIGHT_SERIES),
    ];

    candidates
        .into_iter()
        .filter(|(input, _)| input.chars().count() >= MIN_SUGGEST_INPUT_CHARS)
        .map(|(input, weight)| SuggestEntry {
            input: vec![input.to_string()],
            weight,
        })
        .collect()
}

fn build_search_all(fields: &[&str]) -> String {
    let joined = fields
        .iter()
        .filter(|f| !f.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    normalize_text(&joined)
}

fn coerce_timestamp(source: Option<&chrono::NaiveDateTime>, now: DateTime<Utc>) -> String {
    match source {
        Some(naive) => Utc
            .from_utc_datetime(naive)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        None => now.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}
