//! The reindex state machine
//!
//! ```text
//! PREFLIGHT → CONNECT → ANALYZE → CREATE → POPULATE → VALIDATE → SWAP → RETENT → DONE
//!                                                              │
//!                                                              ↓ failure from any step
//!                                                           CLEANUP_PARTIAL → FAILED
//! ```
//!
//! The pipeline exclusively owns the new physical index until the alias swap.
//! Per-document failures are counted and never fatal; everything else aborts
//! the run, deletes the partial index and preserves the previous alias
//! target.

use crate::backend::{AliasAction, BulkDoc, ClusterStatus, SearchBackend};
use crate::config::{Config, IndexerConfig};
use crate::error::{AppError, Result};
use crate::indexer::document::DocumentBuilder;
use crate::indexer::schema;
use crate::store::ProductStore;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Fixed-width UTC timestamp; lexicographic order equals chronological order
const INDEX_NAME_TIMESTAMP: &str = "%Y_%m_%d_%H_%M_%S";

const CONNECT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const INDEX_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const INDEX_HEALTH_ATTEMPTS: u32 = 15;
const INDEX_HEALTH_INTERVAL: Duration = Duration::from_secs(2);

/// Pacing: shed load once every this many batches
const PACING_EVERY_BATCHES: u64 = 50;
const PACING_SLEEP: Duration = Duration::from_secs(1);

/// Per-document failures logged individually before suppression
const ERROR_LOG_SAMPLE: u64 = 5;

const VALIDATE_PROBE_SIZE: u32 = 5;

/// Tunables for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub alias: String,
    pub index_prefix: String,
    pub batch_size: u32,
    pub max_old_indices: usize,
    pub count_tolerance: u64,
    pub schema_path: Option<PathBuf>,
    /// Stop before SWAP and delete the new index
    pub dry_run: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        let IndexerConfig {
            batch_size,
            max_old_indices,
            count_tolerance,
            ref schema_path,
        } = config.indexer;

        Self {
            alias: config.search.alias.clone(),
            index_prefix: config.search.index_prefix.clone(),
            batch_size,
            max_old_indices,
            count_tolerance,
            schema_path: schema_path.clone(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Final accounting for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub index_name: String,
    pub source_rows: u64,
    pub processed: u64,
    pub skipped: u64,
    pub item_errors: u64,
    pub batches: u64,
    pub swapped: bool,
    pub elapsed: Duration,
}

struct PopulateTotals {
    processed: u64,
    skipped: u64,
    item_errors: u64,
    batches: u64,
}

/// Single-writer batch reindexer
pub struct IndexerPipeline {
    backend: Arc<dyn SearchBackend>,
    store: Arc<dyn ProductStore>,
    options: PipelineOptions,
    shutdown: Arc<AtomicBool>,
}

impl IndexerPipeline {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn ProductStore>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            backend,
            store,
            options,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between batches; setting it aborts the run through the
    /// normal CLEANUP_PARTIAL path
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Run the full pipeline once
    pub async fn run(&self) -> Result<PipelineReport> {
        let started = Instant::now();

        // PREFLIGHT: schema present and parseable
        let raw_schema = schema::load_schema(self.options.schema_path.as_deref())?;
        info!("Preflight passed: schema loaded");

        // CONNECT: both stores reachable, cluster not red
        let health = self
            .backend
            .cluster_health(None, CONNECT_HEALTH_TIMEOUT)
            .await
            .map_err(|e| step_error("connect", e.to_string()))?;
        if health.status == ClusterStatus::Red {
            return Err(step_error("connect", "cluster status is red".to_string()));
        }
        info!(status = %health.status, elapsed_ms = health.elapsed.as_millis() as u64, "Connected to search cluster");
        match self.backend.plugins_installed().await {
            Ok(plugins) => info!(plugins = ?plugins, "Engine plugins"),
            Err(e) => warn!(error = %e, "Could not list engine plugins"),
        }

        // ANALYZE: current generations, alias target, source size
        let pattern = format!("{}_*", self.options.index_prefix);
        let existing = self
            .backend
            .list_indices(&pattern)
            .await
            .map_err(|e| step_error("analyze", e.to_string()))?;
        let current_targets = self
            .backend
            .get_alias(&self.options.alias)
            .await
            .map_err(|e| step_error("analyze", e.to_string()))?;
        let source_rows = self
            .store
            .total_products()
            .await
            .map_err(|e| step_error("analyze", e.to_string()))?;
        if source_rows == 0 {
            return Err(step_error("analyze", "source table has no products".to_string()));
        }
        info!(
            existing_indices = existing.len(),
            alias_targets = ?current_targets,
            source_rows,
            "Analysis complete"
        );

        // CREATE: validate shape, build the new physical index, wait for it
        schema::validate_schema(&raw_schema)?;
        let index_name = format!(
            "{}_{}",
            self.options.index_prefix,
            Utc::now().format(INDEX_NAME_TIMESTAMP)
        );
        if self
            .backend
            .index_exists(&index_name)
            .await
            .map_err(|e| step_error("create", e.to_string()))?
        {
            warn!(index = %index_name, "Index already exists; deleting before create");
            self.backend
                .delete_index(&index_name)
                .await
                .map_err(|e| step_error("create", e.to_string()))?;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.backend
            .create_index(&index_name, &raw_schema)
            .await
            .map_err(|e| step_error("create", e.to_string()))?;
        info!(index = %index_name, "Physical index created");

        // Every failure from here until a successful swap tears the new
        // index down and surfaces the original error.
        match self.build_and_swap(&index_name, &current_targets).await {
            Ok((totals, swapped)) => {
                if swapped {
                    self.apply_retention(&pattern).await;
                } else {
                    // Dry run: the index never became the alias target
                    self.cleanup_partial(&index_name).await;
                }

                let report = PipelineReport {
                    index_name,
                    source_rows,
                    processed: totals.processed,
                    skipped: totals.skipped,
                    item_errors: totals.item_errors,
                    batches: totals.batches,
                    swapped,
                    elapsed: started.elapsed(),
                };
                info!(
                    index = %report.index_name,
                    processed = report.processed,
                    skipped = report.skipped,
                    item_errors = report.item_errors,
                    batches = report.batches,
                    swapped = report.swapped,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Reindex finished"
                );
                Ok(report)
            }
            Err(e) => {
                self.cleanup_partial(&index_name).await;
                Err(e)
            }
        }
    }

    async fn build_and_swap(
        &self,
        index_name: &str,
        current_targets: &[String],
    ) -> Result<(PopulateTotals, bool)> {
        self.wait_for_index(index_name).await?;

        let totals = self.populate(index_name).await?;
        self.validate(index_name, totals.processed).await?;

        if self.options.dry_run {
            info!(index = %index_name, "Dry run: stopping before alias swap");
            return Ok((totals, false));
        }

        self.swap(index_name, current_targets).await?;
        Ok((totals, true))
    }

    async fn wait_for_index(&self, index_name: &str) -> Result<()> {
        for attempt in 1..=INDEX_HEALTH_ATTEMPTS {
            match self
                .backend
                .cluster_health(Some(index_name), INDEX_HEALTH_TIMEOUT)
                .await
            {
                Ok(health) if health.status.is_operational() => {
                    info!(index = %index_name, status = %health.status, attempt, "Index ready");
                    return Ok(());
                }
                Ok(health) => {
                    warn!(index = %index_name, status = %health.status, attempt, "Index not ready yet");
                }
                Err(e) => {
                    warn!(index = %index_name, attempt, error = %e, "Index health probe failed");
                }
            }
            tokio::time::sleep(INDEX_HEALTH_INTERVAL).await;
        }

        Err(step_error(
            "create",
            format!("index {} did not reach yellow in time", index_name),
        ))
    }

    /// POPULATE: stream pages, build documents, bulk upload.
    /// Per-document failures accumulate; transport failures abort.
    async fn populate(&self, index_name: &str) -> Result<PopulateTotals> {
        let mut totals = PopulateTotals {
            processed: 0,
            skipped: 0,
            item_errors: 0,
            batches: 0,
        };
        let mut last_id = 0i64;
        let mut logged_item_errors = 0u64;
        let mut logged_skips = 0u64;

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(step_error("populate", "interrupted".to_string()));
            }

            let page = self
                .store
                .fetch_page(last_id, self.options.batch_size)
                .await
                .map_err(|e| step_error("populate", e.to_string()))?;
            let Some(last_row) = page.last() else {
                break;
            };
            last_id = last_row.product_id;

            let now = Utc::now();
            let mut docs = Vec::with_capacity(page.len());
            for row in &page {
                match DocumentBuilder::build(row, now) {
                    Ok(doc) => docs.push(BulkDoc {
                        id: doc.product_id,
                        body: serde_json::to_value(&doc)
                            .map_err(|e| step_error("populate", e.to_string()))?,
                    }),
                    Err(reason) => {
                        totals.skipped += 1;
                        if logged_skips < ERROR_LOG_SAMPLE {
                            warn!(product_id = row.product_id, reason = %reason, "Row skipped");
                            logged_skips += 1;
                        }
                    }
                }
            }

            let summary = self
                .backend
                .bulk(index_name, &docs)
                .await
                .map_err(|e| step_error("populate", e.to_string()))?;
            totals.processed += summary.indexed;
            totals.item_errors += summary.item_errors.len() as u64;
            for item in &summary.item_errors {
                if logged_item_errors < ERROR_LOG_SAMPLE {
                    warn!(id = %item.id, reason = %item.reason, "Bulk item rejected");
                    logged_item_errors += 1;
                }
            }

            totals.batches += 1;
            if totals.batches % PACING_EVERY_BATCHES == 0 {
                info!(
                    batches = totals.batches,
                    processed = totals.processed,
                    "Pacing pause"
                );
                tokio::time::sleep(PACING_SLEEP).await;
            }
        }

        info!(
            processed = totals.processed,
            skipped = totals.skipped,
            item_errors = totals.item_errors,
            batches = totals.batches,
            "Population complete"
        );
        Ok(totals)
    }

    /// VALIDATE: refresh, count within tolerance, non-empty probe
    async fn validate(&self, index_name: &str, processed: u64) -> Result<()> {
        self.backend
            .refresh(index_name)
            .await
            .map_err(|e| step_error("validate", e.to_string()))?;

        let stats = self
            .backend
            .stats(index_name)
            .await
            .map_err(|e| step_error("validate", e.to_string()))?;
        let discrepancy = stats.doc_count.abs_diff(processed);
        if discrepancy > self.options.count_tolerance {
            return Err(step_error(
                "validate",
                format!(
                    "doc count {} deviates from processed {} by {} (tolerance {})",
                    stats.doc_count, processed, discrepancy, self.options.count_tolerance
                ),
            ));
        }

        let probe = json!({ "query": { "match_all": {} }, "size": VALIDATE_PROBE_SIZE });
        let outcome = self
            .backend
            .search(index_name, &probe)
            .await
            .map_err(|e| step_error("validate", e.to_string()))?;
        if outcome.total < 1 {
            return Err(step_error("validate", "index is empty after population".to_string()));
        }

        info!(index = %index_name, doc_count = stats.doc_count, "Validation passed");
        Ok(())
    }

    /// SWAP: one atomic action group moves the alias
    async fn swap(&self, index_name: &str, current_targets: &[String]) -> Result<()> {
        let mut actions: Vec<AliasAction> = current_targets
            .iter()
            .filter(|target| target.as_str() != index_name)
            .map(|target| AliasAction::Remove {
                index: target.clone(),
                alias: self.options.alias.clone(),
            })
            .collect();
        actions.push(AliasAction::Add {
            index: index_name.to_string(),
            alias: self.options.alias.clone(),
        });

        self.backend
            .update_aliases(&actions)
            .await
            .map_err(|e| step_error("swap", e.to_string()))?;

        info!(alias = %self.options.alias, index = %index_name, "Alias swapped");
        Ok(())
    }

    /// RETENT: keep the newest `max_old_indices + 1` generations.
    /// Failures here are logged and never fail the run.
    async fn apply_retention(&self, pattern: &str) {
        let mut indices = match self.backend.list_indices(pattern).await {
            Ok(indices) => indices,
            Err(e) => {
                warn!(error = %e, "Retention skipped: cannot list indices");
                return;
            }
        };

        indices.sort_unstable_by(|a, b| b.cmp(a));
        for stale in indices.iter().skip(self.options.max_old_indices + 1) {
            match self.backend.delete_index(stale).await {
                Ok(()) => info!(index = %stale, "Retired old index"),
                Err(e) => warn!(index = %stale, error = %e, "Failed to retire old index"),
            }
        }
    }

    /// CLEANUP_PARTIAL: best-effort removal of the uncommitted index
    async fn cleanup_partial(&self, index_name: &str) {
        match self.backend.delete_index(index_name).await {
            Ok(()) => warn!(index = %index_name, "Partial index cleaned up"),
            Err(e) => {
                error!(index = %index_name, error = %e, "Failed to clean up partial index")
            }
        }
    }
}

fn step_error(step: &'static str, message: String) -> AppError {
    AppError::Indexer { step, message }
}
