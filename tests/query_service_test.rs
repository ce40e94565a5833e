//! QueryService routing, fallback and envelope tests

mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use catalog_search::backend::{ClusterStatus, SearchHit, SearchOutcome};
use catalog_search::enrichment::{DynamicDataProvider, NoopDynamicDataProvider};
use catalog_search::error::Result;
use catalog_search::health::HealthGate;
use catalog_search::query::SuggestionKind;
use catalog_search::service::{QueryService, RawSearchParams, ServiceOptions};
use common::{sample_catalogue, MockProductStore, MockSearchBackend};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn service_options() -> ServiceOptions {
    ServiceOptions {
        alias: "products_current".to_string(),
        rescore_window: 50,
        q_length_cap: 200,
        autocomplete_timeout: Duration::from_secs(3),
    }
}

fn build_service(
    backend: Arc<MockSearchBackend>,
    provider: Arc<dyn DynamicDataProvider>,
) -> QueryService {
    let store = Arc::new(MockProductStore::new(sample_catalogue()));
    let gate = HealthGate::new(backend.clone(), Duration::from_secs(5));
    QueryService::new(backend, store, gate, provider, service_options())
}

fn search_params(q: &str) -> RawSearchParams {
    RawSearchParams {
        q: Some(q.to_string()),
        ..Default::default()
    }
}

/// Provider answering fixed attributes for product 1
struct StockProvider;

#[async_trait]
impl DynamicDataProvider for StockProvider {
    async fn fetch(
        &self,
        product_ids: &[i64],
        _city_id: Option<i64>,
        _user_id: Option<i64>,
    ) -> Result<HashMap<i64, Map<String, Value>>> {
        let mut result = HashMap::new();
        if product_ids.contains(&1) {
            let mut attributes = Map::new();
            attributes.insert("in_stock".to_string(), json!(true));
            attributes.insert("quantity".to_string(), json!(7));
            result.insert(1, attributes);
        }
        Ok(result)
    }
}

#[tokio::test]
async fn test_primary_search_shapes_and_enriches() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.set_canned_search(SearchOutcome {
        hits: vec![SearchHit {
            id: "1".to_string(),
            source: json!({ "product_id": 1, "name": "Gadget", "in_stock": false }),
            score: Some(1105.2),
            highlight: Some(json!({ "name": ["<mark>Gadget</mark>"] })),
        }],
        total: 1,
        max_score: Some(1105.2),
        suggest: None,
    });

    let service = build_service(backend, Arc::new(StockProvider));
    let reply = service.search(search_params("AB-123")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.envelope.success);

    let data = reply.envelope.data.unwrap();
    assert_eq!(data.total, 1);
    assert_eq!(data.max_score, Some(1105.2));
    assert_eq!(data.products[0]["score"], 1105.2);
    assert_eq!(data.products[0]["highlight"]["name"][0], "<mark>Gadget</mark>");
    // Enrichment overlaid the dynamic attributes
    assert_eq!(data.products[0]["in_stock"], true);
    assert_eq!(data.products[0]["quantity"], 7);
}

#[tokio::test]
async fn test_backend_failure_yields_degraded_envelope() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.fail_search(true);

    let service = build_service(backend, Arc::new(NoopDynamicDataProvider));
    let reply = service.search(search_params("drill")).await;

    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!reply.envelope.success);
    assert_eq!(reply.envelope.error_code, Some("SERVICE_UNAVAILABLE"));

    // The payload stays well-formed for degraded rendering
    let data = reply.envelope.data.unwrap();
    assert!(data.products.is_empty());
    assert_eq!(data.total, 0);
    assert_eq!(data.page, 1);

    // The failure counted against the gate
    assert!(service.gate().snapshot().consecutive_failures >= 1);
}

#[tokio::test]
async fn test_gate_down_routes_to_relational_fallback() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.set_health(ClusterStatus::Red);

    let service = build_service(backend, Arc::new(NoopDynamicDataProvider));
    let reply = service.search(search_params("AB-123")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.envelope.success);

    let data = reply.envelope.data.unwrap();
    assert_eq!(data.total, 1);
    assert_eq!(data.products[0]["product_id"], 1);
    // Exact external_id match carries the top CASE score
    assert_eq!(data.products[0]["score"], 1000.0);
    // Index-only derivations are stripped from fallback documents
    assert!(data.products[0].get("suggest").is_none());
}

#[tokio::test]
async fn test_fallback_pagination_covers_catalogue_without_duplicates() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.set_health(ClusterStatus::Red);

    let service = build_service(backend, Arc::new(NoopDynamicDataProvider));

    let mut seen = Vec::new();
    for page in 1..=2 {
        let reply = service
            .search(RawSearchParams {
                q: Some(String::new()),
                page: Some(page),
                limit: Some(2),
                ..Default::default()
            })
            .await;
        let data = reply.envelope.data.unwrap();
        assert_eq!(data.total, 4);
        for product in &data.products {
            let id = product["product_id"].as_i64().unwrap();
            assert!(!seen.contains(&id));
            seen.push(id);
        }
    }
    assert_eq!(seen.len(), 4);
}

#[tokio::test]
async fn test_autocomplete_merges_completion_hits_first() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.set_canned_search(SearchOutcome {
        hits: vec![SearchHit {
            id: "3".to_string(),
            source: json!({ "name": "Makita saw", "external_id": "EF-789" }),
            score: Some(5.0),
            highlight: None,
        }],
        total: 1,
        max_score: Some(5.0),
        suggest: Some(json!({
            "product-suggest": [{
                "options": [{ "text": "Makita", "_score": 70.0 }]
            }]
        })),
    });

    let service = build_service(backend, Arc::new(NoopDynamicDataProvider));
    let reply = service.autocomplete(Some("mak".to_string()), Some(5)).await;

    assert_eq!(reply.status, StatusCode::OK);
    let data = reply.envelope.data.unwrap();
    assert_eq!(data.suggestions.len(), 2);
    assert_eq!(data.suggestions[0].text, "Makita");
    assert_eq!(data.suggestions[0].kind, SuggestionKind::Suggest);
    assert_eq!(data.suggestions[1].kind, SuggestionKind::Product);
    assert!(data.suggestions[0].score >= data.suggestions[1].score);
}

#[tokio::test]
async fn test_autocomplete_degrades_silently() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.fail_search(true);

    let service = build_service(backend, Arc::new(NoopDynamicDataProvider));
    let reply = service.autocomplete(Some("mak".to_string()), None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.envelope.success);
    assert!(reply.envelope.data.unwrap().suggestions.is_empty());
}

#[tokio::test]
async fn test_autocomplete_empty_after_sanitization() {
    let backend = Arc::new(MockSearchBackend::new());

    let service = build_service(backend.clone(), Arc::new(NoopDynamicDataProvider));
    let reply = service.autocomplete(Some("!!!@#".to_string()), None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.envelope.data.unwrap().suggestions.is_empty());
    // Nothing was probed or queried for an empty query
    assert_eq!(backend.health_probe_count(), 0);
}

#[tokio::test]
async fn test_autocomplete_fallback_when_gate_down() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.set_health(ClusterStatus::Red);

    let service = build_service(backend, Arc::new(NoopDynamicDataProvider));
    let reply = service.autocomplete(Some("Makita".to_string()), Some(5)).await;

    let data = reply.envelope.data.unwrap();
    assert!(!data.suggestions.is_empty());
    assert_eq!(data.suggestions[0].text, "Makita saw");
    assert_eq!(data.suggestions[0].kind, SuggestionKind::Product);
}

#[tokio::test]
async fn test_availability_validation_errors() {
    let backend = Arc::new(MockSearchBackend::new());
    let service = build_service(backend, Arc::new(StockProvider));

    assert!(service.availability(None, Some("1,2")).await.is_err());
    assert!(service.availability(Some(0), Some("1")).await.is_err());
    assert!(service.availability(Some(1), Some("1,x")).await.is_err());
    assert!(service.availability(Some(1), None).await.is_err());
}

#[tokio::test]
async fn test_availability_defaults_missing_products() {
    let backend = Arc::new(MockSearchBackend::new());
    let service = build_service(backend, Arc::new(StockProvider));

    let reply = service.availability(Some(5), Some("1,2")).await.unwrap();
    assert_eq!(reply.status, StatusCode::OK);

    let data = reply.envelope.data.unwrap();
    assert_eq!(data["1"]["in_stock"], true);
    assert_eq!(data["1"]["quantity"], 7);
    // Products the provider does not know about default to out-of-stock
    assert_eq!(data["2"]["in_stock"], false);
    assert_eq!(data["2"]["quantity"], 0);
}

#[tokio::test]
async fn test_diagnostics_reports_backend_verdict() {
    let backend = Arc::new(MockSearchBackend::new());
    let service = build_service(backend, Arc::new(NoopDynamicDataProvider));

    let data = service.diagnostics().await;
    assert_eq!(data["user_authenticated"], false);
    assert_eq!(data["opensearch_available"], true);
    assert!(data["timestamp"].as_str().is_some());
}
