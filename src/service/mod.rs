//! Top-level query service
//!
//! Entry points for search, autocomplete and availability. The service
//! validates parameters, selects a backend through the HealthGate, routes
//! to the relational fallback when the engine is gated off, shapes hits,
//! overlays dynamic enrichment and is the single place where a backend
//! failure becomes a user-visible degraded envelope.

pub mod spec;

pub use spec::{
    validate_autocomplete, validate_availability, validate_search, AutocompleteSpec,
    AvailabilitySpec, RawSearchParams,
};

use crate::api::envelope::ResponseEnvelope;
use crate::backend::{SearchBackend, SearchHit};
use crate::config::SearchEngineConfig;
use crate::enrichment::{enrich_documents, DynamicDataProvider};
use crate::error::Result;
use crate::health::HealthGate;
use crate::indexer::DocumentBuilder;
use crate::query::{
    build_autocomplete_body, build_search_body, merge_autocomplete, SearchSpec, Suggestion,
    SuggestionKind,
};
use crate::store::{ProductStore, RankedRow};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Search payload inside the envelope
#[derive(Debug, Clone, Serialize)]
pub struct SearchData {
    pub products: Vec<Value>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
}

impl SearchData {
    fn empty(page: u32, limit: u32) -> Self {
        Self {
            products: Vec::new(),
            total: 0,
            page,
            limit,
            max_score: None,
        }
    }
}

/// Autocomplete payload inside the envelope
#[derive(Debug, Clone, Serialize)]
pub struct AutocompleteData {
    pub suggestions: Vec<Suggestion>,
}

/// An HTTP status paired with its envelope, ready for the handler
#[derive(Debug, Clone)]
pub struct Reply<T: Serialize> {
    pub status: StatusCode,
    pub envelope: ResponseEnvelope<T>,
}

impl<T: Serialize> Reply<T> {
    fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: ResponseEnvelope::ok(data),
        }
    }

    fn unavailable(data: T, error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            envelope: ResponseEnvelope::degraded(data, error, "SERVICE_UNAVAILABLE"),
        }
    }
}

/// Service-level tunables derived from the search configuration
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub alias: String,
    pub rescore_window: u32,
    pub q_length_cap: usize,
    pub autocomplete_timeout: Duration,
}

impl ServiceOptions {
    pub fn from_config(config: &SearchEngineConfig) -> Self {
        Self {
            alias: config.alias.clone(),
            rescore_window: config.rescore_window,
            q_length_cap: config.q_length_cap,
            autocomplete_timeout: Duration::from_secs(config.autocomplete_timeout_secs),
        }
    }
}

/// Search and autocomplete entry points with health-gated backend selection
pub struct QueryService {
    backend: Arc<dyn SearchBackend>,
    store: Arc<dyn ProductStore>,
    gate: HealthGate,
    provider: Arc<dyn DynamicDataProvider>,
    options: ServiceOptions,
}

impl QueryService {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn ProductStore>,
        gate: HealthGate,
        provider: Arc<dyn DynamicDataProvider>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            backend,
            store,
            gate,
            provider,
            options,
        }
    }

    pub fn gate(&self) -> &HealthGate {
        &self.gate
    }

    /// Relevance-ranked search with relational fallback
    pub async fn search(&self, params: RawSearchParams) -> Reply<SearchData> {
        let spec = validate_search(params, self.options.q_length_cap);

        if self.gate.is_available().await {
            self.search_primary(&spec).await
        } else {
            self.search_fallback(&spec).await
        }
    }

    async fn search_primary(&self, spec: &SearchSpec) -> Reply<SearchData> {
        let body = build_search_body(spec, self.options.rescore_window);

        match self.backend.search(&self.options.alias, &body).await {
            Ok(outcome) => {
                let mut products = shape_hits(outcome.hits);
                enrich_documents(
                    self.provider.as_ref(),
                    &mut products,
                    spec.city_id,
                    spec.user_id,
                )
                .await;

                Reply::ok(SearchData {
                    products,
                    total: outcome.total,
                    page: spec.page,
                    limit: spec.limit,
                    max_score: outcome.max_score,
                })
            }
            Err(e) => {
                if e.is_backend_failure() {
                    self.gate.record_failure();
                }
                error!(q = %spec.q, error = %e, "Primary search failed");
                Reply::unavailable(
                    SearchData::empty(spec.page, spec.limit),
                    "search service unavailable",
                )
            }
        }
    }

    async fn search_fallback(&self, spec: &SearchSpec) -> Reply<SearchData> {
        match self
            .store
            .fallback_search(&spec.q, spec.page, spec.limit)
            .await
        {
            Ok(page) => {
                let mut products = shape_fallback_rows(page.rows);
                enrich_documents(
                    self.provider.as_ref(),
                    &mut products,
                    spec.city_id,
                    spec.user_id,
                )
                .await;

                Reply {
                    status: StatusCode::OK,
                    envelope: ResponseEnvelope::ok(SearchData {
                        products,
                        total: page.total,
                        page: page.page,
                        limit: page.limit,
                        max_score: None,
                    })
                    .with_debug(json!({ "backend": "relational_fallback" })),
                }
            }
            Err(e) => {
                error!(q = %spec.q, error = %e, "Relational fallback search failed");
                Reply::unavailable(
                    SearchData::empty(spec.page, spec.limit),
                    "search service unavailable",
                )
            }
        }
    }

    /// Prefix autocomplete; degrades silently to an empty suggestion list
    pub async fn autocomplete(&self, q: Option<String>, limit: Option<i64>) -> Reply<AutocompleteData> {
        let spec = validate_autocomplete(q, limit, self.options.q_length_cap);
        if spec.q.is_empty() {
            return Reply::ok(AutocompleteData {
                suggestions: Vec::new(),
            });
        }

        let suggestions = if self.gate.is_available().await {
            self.autocomplete_primary(&spec).await
        } else {
            self.autocomplete_fallback(&spec).await
        };

        Reply::ok(AutocompleteData { suggestions })
    }

    async fn autocomplete_primary(&self, spec: &AutocompleteSpec) -> Vec<Suggestion> {
        let body = build_autocomplete_body(&spec.q, spec.limit);
        let request = self.backend.search(&self.options.alias, &body);

        match tokio::time::timeout(self.options.autocomplete_timeout, request).await {
            Ok(Ok(outcome)) => merge_autocomplete(&outcome, spec.limit),
            Ok(Err(e)) => {
                if e.is_backend_failure() {
                    self.gate.record_failure();
                }
                warn!(q = %spec.q, error = %e, "Autocomplete failed; degrading to empty");
                Vec::new()
            }
            Err(_) => {
                self.gate.record_failure();
                warn!(q = %spec.q, "Autocomplete timed out; degrading to empty");
                Vec::new()
            }
        }
    }

    async fn autocomplete_fallback(&self, spec: &AutocompleteSpec) -> Vec<Suggestion> {
        match self.store.fallback_autocomplete(&spec.q, spec.limit).await {
            Ok(candidates) => candidates
                .into_iter()
                .map(|candidate| Suggestion {
                    text: candidate.text,
                    kind: SuggestionKind::Product,
                    score: candidate.score as f64,
                    external_id: if candidate.external_id.is_empty() {
                        None
                    } else {
                        Some(candidate.external_id)
                    },
                })
                .collect(),
            Err(e) => {
                warn!(q = %spec.q, error = %e, "Fallback autocomplete failed; degrading to empty");
                Vec::new()
            }
        }
    }

    /// Per-city availability lookup through the dynamic-data provider.
    /// Structural parameter problems are validation errors (HTTP 400).
    pub async fn availability(
        &self,
        city_id: Option<i64>,
        product_ids: Option<&str>,
    ) -> Result<Reply<Value>> {
        let spec = validate_availability(city_id, product_ids)?;

        match self
            .provider
            .fetch(&spec.product_ids, Some(spec.city_id), None)
            .await
        {
            Ok(attributes) => {
                let mut data = Map::new();
                for id in &spec.product_ids {
                    let entry = attributes
                        .get(id)
                        .cloned()
                        .map(Value::Object)
                        .unwrap_or_else(|| json!({ "in_stock": false, "quantity": 0 }));
                    data.insert(id.to_string(), entry);
                }
                Ok(Reply::ok(Value::Object(data)))
            }
            Err(e) => {
                warn!(city_id = spec.city_id, error = %e, "Availability lookup failed");
                Ok(Reply::unavailable(
                    Value::Object(Map::new()),
                    "availability data unavailable",
                ))
            }
        }
    }

    /// Diagnostics for the test endpoint
    pub async fn diagnostics(&self) -> Value {
        json!({
            "message": "catalog-search is running",
            "timestamp": Utc::now().to_rfc3339(),
            "user_authenticated": false,
            "opensearch_available": self.gate.is_available().await,
        })
    }
}

/// Merge hit sources with their score and highlight fragments
fn shape_hits(hits: Vec<SearchHit>) -> Vec<Value> {
    hits.into_iter()
        .filter_map(|hit| {
            let mut product = match hit.source {
                Value::Object(object) => object,
                _ => return None,
            };
            if let Some(score) = hit.score {
                product.insert("score".to_string(), json!(score));
            }
            if let Some(highlight) = hit.highlight {
                product.insert("highlight".to_string(), highlight);
            }
            Some(Value::Object(product))
        })
        .collect()
}

/// Shape fallback rows like primary hits: documents with a score attached
fn shape_fallback_rows(rows: Vec<RankedRow>) -> Vec<Value> {
    let now = Utc::now();
    rows.into_iter()
        .filter_map(|ranked| {
            let document = DocumentBuilder::build(&ranked.row, now).ok()?;
            let mut product = match serde_json::to_value(&document).ok()? {
                Value::Object(object) => object,
                _ => return None,
            };
            // Index-only derivations are not part of the response shape
            product.remove("suggest");
            product.remove("search_all");
            product.insert("score".to_string(), json!(ranked.relevance as f64));
            Some(Value::Object(product))
        })
        .collect()
}
