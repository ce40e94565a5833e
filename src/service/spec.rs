//! Request parameter validation and clamping
//!
//! Pagination is clamped rather than rejected; structurally invalid input
//! (bad ids, oversized id lists) is a validation error surfaced as HTTP 400.

use crate::error::{AppError, Result};
use crate::query::{Filters, SearchSpec, Sort};

/// Default page size when none is supplied
pub const DEFAULT_LIMIT: u32 = 20;
/// Page size ceiling
pub const MAX_LIMIT: u32 = 100;
/// Autocomplete result-count bounds
pub const DEFAULT_AUTOCOMPLETE_LIMIT: u32 = 10;
pub const MAX_AUTOCOMPLETE_LIMIT: u32 = 20;
/// Most product ids accepted by one availability lookup
pub const MAX_PRODUCT_IDS: usize = 1000;

/// Raw search parameters as parsed from the query string
#[derive(Debug, Clone, Default)]
pub struct RawSearchParams {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub city_id: Option<i64>,
    pub user_id: Option<i64>,
    pub brand_name: Option<String>,
    pub series_name: Option<String>,
    pub category: Option<String>,
}

/// Clamp and normalize raw search parameters into a validated spec
pub fn validate_search(params: RawSearchParams, q_length_cap: usize) -> SearchSpec {
    let q = params
        .q
        .map(|q| truncate_chars(q.trim(), q_length_cap))
        .unwrap_or_default();

    let page = params.page.unwrap_or(1).max(1) as u32;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIMIT as i64)
        .clamp(1, MAX_LIMIT as i64) as u32;
    let sort = Sort::parse(params.sort.as_deref().unwrap_or(""));

    SearchSpec {
        q,
        page,
        limit,
        sort,
        city_id: params.city_id.filter(|id| *id > 0),
        user_id: params.user_id.filter(|id| *id > 0),
        filters: Filters {
            brand_name: non_empty(params.brand_name),
            series_name: non_empty(params.series_name),
            category: non_empty(params.category),
        },
    }
}

/// A validated autocomplete request
#[derive(Debug, Clone, PartialEq)]
pub struct AutocompleteSpec {
    /// Sanitized query; may be empty, in which case no lookup runs
    pub q: String,
    pub limit: u32,
}

/// Sanitize the autocomplete query (letters, digits, whitespace and `-_.`
/// survive) and clamp the limit
pub fn validate_autocomplete(
    q: Option<String>,
    limit: Option<i64>,
    q_length_cap: usize,
) -> AutocompleteSpec {
    let sanitized: String = q
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '-' | '_' | '.'))
        .collect();
    let q = truncate_chars(
        &sanitized.split_whitespace().collect::<Vec<_>>().join(" "),
        q_length_cap,
    );

    let limit = limit
        .unwrap_or(DEFAULT_AUTOCOMPLETE_LIMIT as i64)
        .clamp(1, MAX_AUTOCOMPLETE_LIMIT as i64) as u32;

    AutocompleteSpec { q, limit }
}

/// A validated availability request
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilitySpec {
    pub city_id: i64,
    /// Distinct positive ids in input order
    pub product_ids: Vec<i64>,
}

/// Parse the availability parameters; structural problems are rejected
pub fn validate_availability(city_id: Option<i64>, product_ids: Option<&str>) -> Result<AvailabilitySpec> {
    let city_id = city_id
        .filter(|id| *id >= 1)
        .ok_or_else(|| AppError::Validation("city_id must be a positive integer".to_string()))?;

    let raw = product_ids
        .filter(|csv| !csv.trim().is_empty())
        .ok_or_else(|| AppError::Validation("product_ids is required".to_string()))?;

    let mut ids = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let id: i64 = token.parse().map_err(|_| {
            AppError::Validation(format!("product_ids contains a non-integer value: '{}'", token))
        })?;
        if id <= 0 {
            return Err(AppError::Validation(format!(
                "product_ids contains a non-positive id: {}",
                id
            )));
        }
        if !ids.contains(&id) {
            ids.push(id);
        }
        if ids.len() > MAX_PRODUCT_IDS {
            return Err(AppError::Validation(format!(
                "product_ids accepts at most {} distinct ids",
                MAX_PRODUCT_IDS
            )));
        }
    }

    if ids.is_empty() {
        return Err(AppError::Validation("product_ids is empty".to_string()));
    }

    Ok(AvailabilitySpec { city_id, product_ids: ids })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn truncate_chars(input: &str, cap: usize) -> String {
    input.chars().take(cap).collect()
}
