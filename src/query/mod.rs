//! Query engine: validated query specs, the tagged clause tree and the
//! request-body builders
//!
//! A [`SearchSpec`] is the validated form of the raw query parameters; the
//! builders in this module translate it into the search engine's request
//! body in exactly one place. Clause construction and boosting are
//! type-checked through [`clause::Clause`] before anything is rendered to
//! the wire format.

pub mod builder;
pub mod clause;

pub use builder::{build_autocomplete_body, build_search_body, is_code, merge_autocomplete};
pub use clause::Clause;

use serde::{Deserialize, Serialize};

/// Sort orders accepted by the search surface; unknown input falls back
/// to relevance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    #[default]
    Relevance,
    Name,
    ExternalId,
    PriceAsc,
    PriceDesc,
    Availability,
    Popularity,
}

impl Sort {
    /// Parse a raw sort parameter; anything unrecognized is relevance
    pub fn parse(raw: &str) -> Self {
        match raw {
            "relevance" => Sort::Relevance,
            "name" => Sort::Name,
            "external_id" => Sort::ExternalId,
            "price_asc" => Sort::PriceAsc,
            "price_desc" => Sort::PriceDesc,
            "availability" => Sort::Availability,
            "popularity" => Sort::Popularity,
            _ => Sort::Relevance,
        }
    }
}

/// Optional exact-match filters applied alongside the relevance query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub brand_name: Option<String>,
    pub series_name: Option<String>,
    pub category: Option<String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.brand_name.is_none() && self.series_name.is_none() && self.category.is_none()
    }
}

/// A validated search request
#[derive(Debug, Clone)]
pub struct SearchSpec {
    pub q: String,
    /// 1-based page, already clamped to >= 1
    pub page: u32,
    /// Page size, already clamped to 1..=100
    pub limit: u32,
    pub sort: Sort,
    pub city_id: Option<i64>,
    pub user_id: Option<i64>,
    pub filters: Filters,
}

impl SearchSpec {
    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }
}

/// Where an autocomplete entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// Completion-suggester hit
    Suggest,
    /// Secondary product-query hit
    Product,
}

/// One autocomplete entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}
