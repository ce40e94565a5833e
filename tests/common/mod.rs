//! Shared test fixtures: scripted in-memory implementations of the search
//! backend and the product store

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_search::backend::{
    AliasAction, BulkDoc, BulkItemError, BulkSummary, ClusterHealth, ClusterStatus, IndexStats,
    SearchBackend, SearchHit, SearchOutcome,
};
use catalog_search::error::{AppError, Result};
use catalog_search::models::ProductRow;
use catalog_search::store::{FallbackPage, FallbackSuggestion, ProductStore, RankedRow};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Default)]
struct MockBackendState {
    indices: BTreeMap<String, Vec<Value>>,
    aliases: HashMap<String, Vec<String>>,
    health_status: Option<ClusterStatus>,
    health_elapsed: Duration,
    health_probes: u64,
    bulk_calls: u64,
    fail_bulk_on_call: Option<u64>,
    fail_search: bool,
    canned_search: Option<SearchOutcome>,
    alias_updates: Vec<Vec<AliasAction>>,
    scripted_item_errors: Vec<BulkItemError>,
}

/// Scriptable in-memory search backend
#[derive(Default)]
pub struct MockSearchBackend {
    state: Mutex<MockBackendState>,
}

impl MockSearchBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.state.lock().health_status = Some(ClusterStatus::Green);
        backend.state.lock().health_elapsed = Duration::from_millis(10);
        backend
    }

    pub fn set_health(&self, status: ClusterStatus) {
        self.state.lock().health_status = Some(status);
    }

    pub fn set_health_elapsed(&self, elapsed: Duration) {
        self.state.lock().health_elapsed = elapsed;
    }

    /// Make health probes fail outright
    pub fn fail_health(&self) {
        self.state.lock().health_status = None;
    }

    /// Fail the nth bulk call (1-based) with a transport error
    pub fn fail_bulk_on_call(&self, call: u64) {
        self.state.lock().fail_bulk_on_call = Some(call);
    }

    pub fn fail_search(&self, fail: bool) {
        self.state.lock().fail_search = fail;
    }

    pub fn set_canned_search(&self, outcome: SearchOutcome) {
        self.state.lock().canned_search = Some(outcome);
    }

    pub fn script_item_errors(&self, errors: Vec<BulkItemError>) {
        self.state.lock().scripted_item_errors = errors;
    }

    /// Seed a pre-existing physical index with the given document count
    pub fn seed_index(&self, name: &str, docs: u64) {
        let mut state = self.state.lock();
        state.indices.insert(
            name.to_string(),
            (0..docs)
                .map(|i| serde_json::json!({ "product_id": i + 1 }))
                .collect(),
        );
    }

    pub fn seed_alias(&self, alias: &str, index: &str) {
        self.state
            .lock()
            .aliases
            .insert(alias.to_string(), vec![index.to_string()]);
    }

    pub fn index_names(&self) -> Vec<String> {
        self.state.lock().indices.keys().cloned().collect()
    }

    pub fn alias_targets(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .aliases
            .get(alias)
            .cloned()
            .unwrap_or_default()
    }

    pub fn alias_update_history(&self) -> Vec<Vec<AliasAction>> {
        self.state.lock().alias_updates.clone()
    }

    pub fn health_probe_count(&self) -> u64 {
        self.state.lock().health_probes
    }

    pub fn docs_in(&self, index: &str) -> Vec<Value> {
        self.state
            .lock()
            .indices
            .get(index)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn bulk(&self, index: &str, docs: &[BulkDoc]) -> Result<BulkSummary> {
        let mut state = self.state.lock();
        state.bulk_calls += 1;
        if state.fail_bulk_on_call == Some(state.bulk_calls) {
            return Err(AppError::Backend("bulk upload: HTTP 500".to_string()));
        }

        let item_errors = std::mem::take(&mut state.scripted_item_errors);
        let failed: Vec<String> = item_errors.iter().map(|e| e.id.clone()).collect();

        let stored = state.indices.entry(index.to_string()).or_default();
        let mut indexed = 0;
        for doc in docs {
            if failed.contains(&doc.id.to_string()) {
                continue;
            }
            stored.push(doc.body.clone());
            indexed += 1;
        }

        Ok(BulkSummary {
            indexed,
            item_errors,
        })
    }

    async fn search(&self, index: &str, _body: &Value) -> Result<SearchOutcome> {
        let state = self.state.lock();
        if state.fail_search {
            return Err(AppError::Backend("search: HTTP 503".to_string()));
        }
        if let Some(canned) = &state.canned_search {
            return Ok(canned.clone());
        }

        let docs = state
            .indices
            .get(index)
            .or_else(|| {
                state
                    .aliases
                    .get(index)
                    .and_then(|targets| targets.first())
                    .and_then(|target| state.indices.get(target))
            })
            .cloned()
            .unwrap_or_default();

        Ok(SearchOutcome {
            total: docs.len() as u64,
            max_score: Some(1.0),
            hits: docs
                .iter()
                .take(5)
                .map(|doc| SearchHit {
                    id: doc
                        .get("product_id")
                        .and_then(Value::as_i64)
                        .unwrap_or_default()
                        .to_string(),
                    source: doc.clone(),
                    score: Some(1.0),
                    highlight: None,
                })
                .collect(),
            suggest: None,
        })
    }

    async fn create_index(&self, name: &str, _schema: &Value) -> Result<()> {
        self.state
            .lock()
            .indices
            .insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        self.state.lock().indices.remove(name);
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().indices.contains_key(name))
    }

    async fn refresh(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn stats(&self, name: &str) -> Result<IndexStats> {
        let state = self.state.lock();
        let docs = state
            .indices
            .get(name)
            .ok_or_else(|| AppError::Backend(format!("no such index: {}", name)))?;
        Ok(IndexStats {
            doc_count: docs.len() as u64,
        })
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
        let mut state = self.state.lock();
        state.alias_updates.push(actions.to_vec());
        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    let targets = state.aliases.entry(alias.clone()).or_default();
                    if !targets.contains(index) {
                        targets.push(index.clone());
                    }
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(targets) = state.aliases.get_mut(alias) {
                        targets.retain(|t| t != index);
                    }
                }
            }
        }
        Ok(())
    }

    async fn get_alias(&self, alias: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .aliases
            .get(alias)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .state
            .lock()
            .indices
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn cluster_health(
        &self,
        _index: Option<&str>,
        _timeout: Duration,
    ) -> Result<ClusterHealth> {
        let mut state = self.state.lock();
        state.health_probes += 1;
        match state.health_status {
            Some(status) => Ok(ClusterHealth {
                status,
                elapsed: state.health_elapsed,
            }),
            None => Err(AppError::Timeout("health probe timed out".to_string())),
        }
    }

    async fn plugins_installed(&self) -> Result<Vec<String>> {
        Ok(vec!["analysis-icu".to_string()])
    }
}

/// In-memory product store with the fallback ranking mirrored in Rust
#[derive(Default)]
pub struct MockProductStore {
    rows: Vec<ProductRow>,
    fail_fallback: Mutex<bool>,
}

impl MockProductStore {
    pub fn new(mut rows: Vec<ProductRow>) -> Self {
        rows.sort_by_key(|r| r.product_id);
        Self {
            rows,
            fail_fallback: Mutex::new(false),
        }
    }

    pub fn fail_fallback(&self, fail: bool) {
        *self.fail_fallback.lock() = fail;
    }

    fn relevance(row: &ProductRow, q: &str) -> i64 {
        if row.external_id == q {
            1000
        } else if row.sku == q {
            900
        } else if row.external_id.starts_with(q) {
            100
        } else if row.sku.starts_with(q) {
            90
        } else if row.name == q {
            80
        } else if row.name.starts_with(q) {
            50
        } else if row.name.contains(q) {
            30
        } else if row.brand_name.contains(q) {
            20
        } else if row.description.contains(q) {
            10
        } else {
            1
        }
    }

    fn matches(row: &ProductRow, q: &str) -> bool {
        row.external_id.contains(q)
            || row.sku.contains(q)
            || row.name.contains(q)
            || row.brand_name.contains(q)
            || row.description.contains(q)
    }
}

#[async_trait]
impl ProductStore for MockProductStore {
    async fn total_products(&self) -> Result<u64> {
        Ok(self.rows.iter().filter(|r| r.product_id > 0).count() as u64)
    }

    async fn fetch_page(&self, after_id: i64, limit: u32) -> Result<Vec<ProductRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.product_id > after_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fallback_search(&self, q: &str, page: u32, limit: u32) -> Result<FallbackPage> {
        if *self.fail_fallback.lock() {
            return Err(AppError::Database("connection refused".to_string()));
        }

        let page = page.max(1);
        let mut matched: Vec<RankedRow> = self
            .rows
            .iter()
            .filter(|r| r.product_id > 0 && (q.is_empty() || Self::matches(r, q)))
            .map(|r| RankedRow {
                row: r.clone(),
                relevance: if q.is_empty() { 1 } else { Self::relevance(r, q) },
            })
            .collect();
        matched.sort_by(|a, b| {
            b.relevance
                .cmp(&a.relevance)
                .then_with(|| a.row.name.cmp(&b.row.name))
        });

        let total = matched.len() as u64;
        let offset = ((page - 1) * limit) as usize;
        let rows = matched
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();

        Ok(FallbackPage {
            rows,
            total,
            page,
            limit,
        })
    }

    async fn fallback_autocomplete(
        &self,
        q: &str,
        limit: u32,
    ) -> Result<Vec<FallbackSuggestion>> {
        if *self.fail_fallback.lock() {
            return Err(AppError::Database("connection refused".to_string()));
        }

        let mut suggestions: Vec<FallbackSuggestion> = self
            .rows
            .iter()
            .filter(|r| r.product_id > 0)
            .filter_map(|r| {
                let score = if r.name.starts_with(q) {
                    100
                } else if r.external_id.starts_with(q) {
                    90
                } else if r.name.contains(q) {
                    50
                } else {
                    return None;
                };
                Some(FallbackSuggestion {
                    text: r.name.clone(),
                    external_id: r.external_id.clone(),
                    score,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.text.cmp(&b.text)));
        suggestions.truncate(limit as usize);
        Ok(suggestions)
    }
}

/// Build a product row with the identity fields set
pub fn product_row(product_id: i64, external_id: &str, sku: &str, name: &str) -> ProductRow {
    ProductRow {
        product_id,
        external_id: external_id.to_string(),
        sku: sku.to_string(),
        name: name.to_string(),
        description: format!("{} description", name),
        brand_id: 1,
        brand_name: "Makita".to_string(),
        series_id: 0,
        series_name: String::new(),
        unit: "pc".to_string(),
        dimensions: String::new(),
        min_sale: 1,
        weight: 1.0,
        created_at: None,
        updated_at: None,
    }
}

/// A small catalogue used across tests
pub fn sample_catalogue() -> Vec<ProductRow> {
    vec![
        product_row(1, "AB-123", "S1", "Gadget"),
        product_row(2, "CD-456", "S2", "Hammer drill"),
        product_row(3, "EF-789", "S3", "Makita saw"),
        product_row(4, "GH-012", "S4", "Wrench"),
    ]
}
