use crate::api::envelope::ResponseEnvelope;
use crate::api::AppState;
use crate::error::Result;
use crate::service::{AutocompleteData, RawSearchParams, SearchData};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query-string parameters for `/api/search`
#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
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

impl From<SearchParams> for RawSearchParams {
    fn from(params: SearchParams) -> Self {
        RawSearchParams {
            q: params.q,
            page: params.page,
            limit: params.limit,
            sort: params.sort,
            city_id: params.city_id,
            user_id: params.user_id,
            brand_name: params.brand_name,
            series_name: params.series_name,
            category: params.category,
        }
    }
}

/// Relevance-ranked product search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Json<ResponseEnvelope<SearchData>>) {
    let reply = state.query_service.search(params.into()).await;
    (reply.status, Json(reply.envelope))
}

/// Query-string parameters for `/api/autocomplete`
#[derive(Debug, Deserialize, Default)]
pub struct AutocompleteParams {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Prefix autocomplete
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> (StatusCode, Json<ResponseEnvelope<AutocompleteData>>) {
    let reply = state
        .query_service
        .autocomplete(params.q, params.limit)
        .await;
    (reply.status, Json(reply.envelope))
}

/// Query-string parameters for `/api/availability`
#[derive(Debug, Deserialize, Default)]
pub struct AvailabilityParams {
    pub city_id: Option<i64>,
    pub product_ids: Option<String>,
}

/// Per-city stock availability for a list of products
pub async fn availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityParams>,
) -> Result<(StatusCode, Json<ResponseEnvelope<Value>>)> {
    let reply = state
        .query_service
        .availability(params.city_id, params.product_ids.as_deref())
        .await?;
    Ok((reply.status, Json(reply.envelope)))
}

/// Connectivity diagnostics
pub async fn test_endpoint(
    State(state): State<AppState>,
) -> Json<ResponseEnvelope<Value>> {
    let data = state.query_service.diagnostics().await;
    Json(ResponseEnvelope::ok(data))
}

/// Process liveness plus the gate's current verdict
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.query_service.gate().snapshot();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        search_backend: snapshot.status.to_string(),
        consecutive_failures: snapshot.consecutive_failures,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub search_backend: String,
    pub consecutive_failures: u32,
}
