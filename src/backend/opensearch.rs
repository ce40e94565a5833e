//! HTTP implementation of [`SearchBackend`] for an OpenSearch-compatible
//! cluster

use crate::backend::{
    AliasAction, BulkDoc, BulkItemError, BulkSummary, ClusterHealth, ClusterStatus, IndexStats,
    SearchBackend, SearchHit, SearchOutcome,
};
use crate::config::SearchEngineConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

/// Search backend speaking the engine's REST API over a pooled HTTP client
#[derive(Clone)]
pub struct OpenSearchBackend {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    search_timeout: Duration,
    bulk_timeout: Duration,
}

impl OpenSearchBackend {
    /// Create a new backend from configuration
    pub fn new(config: &SearchEngineConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            search_timeout: Duration::from_secs(config.search_timeout_secs),
            bulk_timeout: Duration::from_secs(config.bulk_timeout_secs),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.client.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    /// Map a non-success response into the error taxonomy
    async fn fail(response: reqwest::Response, context: &str) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            AppError::Backend(format!("{}: HTTP {}: {}", context, status, body))
        } else {
            AppError::Internal(format!("{}: HTTP {}: {}", context, status, body))
        }
    }
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    async fn bulk(&self, index: &str, docs: &[BulkDoc]) -> Result<BulkSummary> {
        if docs.is_empty() {
            return Ok(BulkSummary::default());
        }

        let mut payload = String::with_capacity(docs.len() * 256);
        for doc in docs {
            payload.push_str(&json!({ "index": { "_id": doc.id.to_string() } }).to_string());
            payload.push('\n');
            payload.push_str(&doc.body.to_string());
            payload.push('\n');
        }

        let response = self
            .request(Method::POST, &format!("{}/_bulk?refresh=false", index))
            .header("content-type", "application/x-ndjson")
            .timeout(self.bulk_timeout)
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "bulk upload").await);
        }

        let body: Value = response.json().await?;
        let mut summary = BulkSummary::default();

        if let Some(items) = body.get("items").and_then(Value::as_array) {
            for item in items {
                let Some(op) = item.get("index") else { continue };
                let id = op
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                match op.get("error") {
                    Some(error) => summary.item_errors.push(BulkItemError {
                        id,
                        reason: error
                            .get("reason")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown bulk item error")
                            .to_string(),
                    }),
                    None => summary.indexed += 1,
                }
            }
        }

        debug!(
            index = index,
            indexed = summary.indexed,
            item_errors = summary.item_errors.len(),
            "Bulk upload completed"
        );

        Ok(summary)
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchOutcome> {
        let response = self
            .request(Method::POST, &format!("{}/_search", index))
            .timeout(self.search_timeout)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "search").await);
        }

        let body: Value = response.json().await?;

        let total = body
            .pointer("/hits/total/value")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let max_score = body.pointer("/hits/max_score").and_then(Value::as_f64);

        let hits = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|raw| {
                raw.iter()
                    .map(|hit| SearchHit {
                        id: hit
                            .get("_id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        source: hit.get("_source").cloned().unwrap_or(Value::Null),
                        score: hit.get("_score").and_then(Value::as_f64),
                        highlight: hit.get("highlight").cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(SearchOutcome {
            hits,
            total,
            max_score,
            suggest: body.get("suggest").cloned(),
        })
    }

    async fn create_index(&self, name: &str, schema: &Value) -> Result<()> {
        let response = self
            .request(Method::PUT, name)
            .timeout(Duration::from_secs(30))
            .json(schema)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "create index").await);
        }
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, name)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(Self::fail(response, "delete index").await);
        }
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, name)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::fail(response, "index exists").await),
        }
    }

    async fn refresh(&self, name: &str) -> Result<()> {
        let response = self
            .request(Method::POST, &format!("{}/_refresh", name))
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "refresh").await);
        }
        Ok(())
    }

    async fn stats(&self, name: &str) -> Result<IndexStats> {
        let response = self
            .request(Method::GET, &format!("{}/_count", name))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "index stats").await);
        }

        let body: Value = response.json().await?;
        Ok(IndexStats {
            doc_count: body.get("count").and_then(Value::as_u64).unwrap_or(0),
        })
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
        let actions: Vec<Value> = actions
            .iter()
            .map(|action| match action {
                AliasAction::Add { index, alias } => {
                    json!({ "add": { "index": index, "alias": alias } })
                }
                AliasAction::Remove { index, alias } => {
                    json!({ "remove": { "index": index, "alias": alias } })
                }
            })
            .collect();

        let response = self
            .request(Method::POST, "_aliases")
            .timeout(Duration::from_secs(30))
            .json(&json!({ "actions": actions }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "update aliases").await);
        }
        Ok(())
    }

    async fn get_alias(&self, alias: &str) -> Result<Vec<String>> {
        let response = self
            .request(Method::GET, &format!("_alias/{}", alias))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Self::fail(response, "get alias").await);
        }

        let body: Value = response.json().await?;
        Ok(body
            .as_object()
            .map(|indices| indices.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>> {
        let response = self
            .request(
                Method::GET,
                &format!("_cat/indices/{}?format=json&h=index", pattern),
            )
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Self::fail(response, "list indices").await);
        }

        let body: Value = response.json().await?;
        Ok(body
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("index").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn cluster_health(
        &self,
        index: Option<&str>,
        timeout: Duration,
    ) -> Result<ClusterHealth> {
        let path = match index {
            Some(index) => format!("_cluster/health/{}?timeout={}s", index, timeout.as_secs()),
            None => format!("_cluster/health?timeout={}s", timeout.as_secs()),
        };

        let start = Instant::now();
        let response = self
            .request(Method::GET, &path)
            .timeout(timeout)
            .send()
            .await?;
        let elapsed = start.elapsed();

        // The health endpoint answers 408 with a body when the awaited
        // status is not reached inside the engine-side timeout.
        if !response.status().is_success() && response.status() != StatusCode::REQUEST_TIMEOUT {
            return Err(Self::fail(response, "cluster health").await);
        }

        let body: Value = response.json().await?;
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .map(ClusterStatus::parse)
            .unwrap_or(ClusterStatus::Red);

        Ok(ClusterHealth { status, elapsed })
    }

    async fn plugins_installed(&self) -> Result<Vec<String>> {
        let response = self
            .request(Method::GET, "_cat/plugins?format=json&h=component")
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "list plugins").await);
        }

        let body: Value = response.json().await?;
        Ok(body
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("component").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}
