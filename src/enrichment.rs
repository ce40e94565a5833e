//! Dynamic per-product data enrichment
//!
//! Stock, pricing and delivery attributes live in an external service.
//! Only its contract is modelled here: a provider is handed the product ids
//! of a hit set and returns per-id attribute maps that are shallow-overlaid
//! onto the response documents. Provider failures never block a response.

use crate::config::EnrichmentConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Contract for the dynamic-data source
#[async_trait]
pub trait DynamicDataProvider: Send + Sync {
    /// Fetch per-product attributes for a hit set
    async fn fetch(
        &self,
        product_ids: &[i64],
        city_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<HashMap<i64, Map<String, Value>>>;
}

/// Provider used when no endpoint is configured; enriches nothing
pub struct NoopDynamicDataProvider;

#[async_trait]
impl DynamicDataProvider for NoopDynamicDataProvider {
    async fn fetch(
        &self,
        _product_ids: &[i64],
        _city_id: Option<i64>,
        _user_id: Option<i64>,
    ) -> Result<HashMap<i64, Map<String, Value>>> {
        Ok(HashMap::new())
    }
}

/// HTTP provider calling the dynamic-data service
pub struct HttpDynamicDataProvider {
    client: Client,
    endpoint: String,
}

impl HttpDynamicDataProvider {
    pub fn new(config: &EnrichmentConfig) -> Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Some(Self { client, endpoint }))
    }
}

#[async_trait]
impl DynamicDataProvider for HttpDynamicDataProvider {
    async fn fetch(
        &self,
        product_ids: &[i64],
        city_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<HashMap<i64, Map<String, Value>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "product_ids": product_ids,
                "city_id": city_id,
                "user_id": user_id,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Backend(format!(
                "dynamic data provider answered HTTP {}",
                response.status()
            )));
        }

        let body: HashMap<String, Map<String, Value>> = response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("dynamic data decode failed: {}", e)))?;

        Ok(body
            .into_iter()
            .filter_map(|(id, attributes)| id.parse::<i64>().ok().map(|id| (id, attributes)))
            .collect())
    }
}

/// Shallow-overlay provider attributes onto response documents, keyed by
/// `product_id`. Documents without attributes pass through unchanged.
pub fn overlay_attributes(
    documents: &mut [Value],
    attributes: &HashMap<i64, Map<String, Value>>,
) {
    if attributes.is_empty() {
        return;
    }

    for document in documents.iter_mut() {
        let Some(id) = document.get("product_id").and_then(Value::as_i64) else {
            continue;
        };
        let Some(extra) = attributes.get(&id) else {
            continue;
        };
        if let Some(object) = document.as_object_mut() {
            for (key, value) in extra {
                object.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Fetch attributes for a hit set, logging instead of failing
pub async fn enrich_documents(
    provider: &dyn DynamicDataProvider,
    documents: &mut [Value],
    city_id: Option<i64>,
    user_id: Option<i64>,
) {
    let product_ids: Vec<i64> = documents
        .iter()
        .filter_map(|doc| doc.get("product_id").and_then(Value::as_i64))
        .collect();
    if product_ids.is_empty() {
        return;
    }

    match provider.fetch(&product_ids, city_id, user_id).await {
        Ok(attributes) => overlay_attributes(documents, &attributes),
        Err(e) => {
            warn!(error = %e, products = product_ids.len(), "Dynamic enrichment failed; responding without it");
        }
    }
}
