//! End-to-end pipeline tests against scripted in-memory backends

mod common;

use catalog_search::backend::BulkItemError;
use catalog_search::indexer::{IndexerPipeline, PipelineOptions};
use catalog_search::models::ProductRow;
use catalog_search::store::ProductStore;
use common::{product_row, sample_catalogue, MockProductStore, MockSearchBackend};
use std::sync::Arc;

fn options() -> PipelineOptions {
    PipelineOptions {
        alias: "products_current".to_string(),
        index_prefix: "products".to_string(),
        batch_size: 2,
        max_old_indices: 2,
        count_tolerance: 10,
        schema_path: None,
        dry_run: false,
    }
}

fn pipeline_with(
    backend: Arc<MockSearchBackend>,
    rows: Vec<ProductRow>,
    options: PipelineOptions,
) -> IndexerPipeline {
    let store: Arc<dyn ProductStore> = Arc::new(MockProductStore::new(rows));
    IndexerPipeline::new(backend, store, options)
}

#[tokio::test]
async fn test_successful_run_swaps_alias() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.seed_index("products_2024_01_01_00_00_00", 4);
    backend.seed_alias("products_current", "products_2024_01_01_00_00_00");

    let pipeline = pipeline_with(backend.clone(), sample_catalogue(), options());
    let report = pipeline.run().await.unwrap();

    assert!(report.swapped);
    assert_eq!(report.processed, 4);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.item_errors, 0);
    assert_eq!(report.batches, 2);
    assert_eq!(report.source_rows, 4);

    // Alias resolves to exactly the new index
    let targets = backend.alias_targets("products_current");
    assert_eq!(targets, vec![report.index_name.clone()]);
    assert_ne!(targets[0], "products_2024_01_01_00_00_00");

    // The swap was submitted as one atomic action group
    let updates = backend.alias_update_history();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].len(), 2);

    // New index holds every document
    assert_eq!(backend.docs_in(&report.index_name).len(), 4);
}

#[tokio::test]
async fn test_bulk_failure_preserves_previous_alias_and_cleans_partial() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.seed_index("products_2024_01_01_00_00_00", 4);
    backend.seed_alias("products_current", "products_2024_01_01_00_00_00");
    backend.fail_bulk_on_call(1);

    let pipeline = pipeline_with(backend.clone(), sample_catalogue(), options());
    let err = pipeline.run().await.unwrap_err();
    assert!(err.to_string().contains("populate"));

    // Previous alias target is untouched
    assert_eq!(
        backend.alias_targets("products_current"),
        vec!["products_2024_01_01_00_00_00".to_string()]
    );
    assert!(backend.alias_update_history().is_empty());

    // The partial index created by this run is gone
    assert_eq!(
        backend.index_names(),
        vec!["products_2024_01_01_00_00_00".to_string()]
    );
}

#[tokio::test]
async fn test_retention_keeps_newest_generations() {
    let backend = Arc::new(MockSearchBackend::new());
    for name in [
        "products_2024_01_01_00_00_00",
        "products_2024_02_01_00_00_00",
        "products_2024_03_01_00_00_00",
        "products_2024_04_01_00_00_00",
    ] {
        backend.seed_index(name, 1);
    }
    backend.seed_alias("products_current", "products_2024_04_01_00_00_00");

    let pipeline = pipeline_with(backend.clone(), sample_catalogue(), options());
    let report = pipeline.run().await.unwrap();

    // New index plus the two most recent older generations survive
    let mut names = backend.index_names();
    names.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(names.len(), 3);
    assert_eq!(names[0], report.index_name);
    assert_eq!(names[1], "products_2024_04_01_00_00_00");
    assert_eq!(names[2], "products_2024_03_01_00_00_00");
}

#[tokio::test]
async fn test_zero_source_rows_aborts_before_create() {
    let backend = Arc::new(MockSearchBackend::new());

    let pipeline = pipeline_with(backend.clone(), Vec::new(), options());
    let err = pipeline.run().await.unwrap_err();

    assert!(err.to_string().contains("analyze"));
    assert!(backend.index_names().is_empty());
}

#[tokio::test]
async fn test_all_rows_skipped_fails_validation_and_cleans_up() {
    let backend = Arc::new(MockSearchBackend::new());

    // Rows carry positive ids but no identity fields, so every one skips
    let mut rows = vec![product_row(1, "", "", ""), product_row(2, "", "", "")];
    for row in &mut rows {
        row.description = String::new();
    }

    let pipeline = pipeline_with(backend.clone(), rows, options());
    let err = pipeline.run().await.unwrap_err();

    assert!(err.to_string().contains("validate"));
    assert!(backend.index_names().is_empty());
    assert!(backend.alias_targets("products_current").is_empty());
}

#[tokio::test]
async fn test_item_errors_are_counted_not_fatal() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.script_item_errors(vec![BulkItemError {
        id: "2".to_string(),
        reason: "mapper_parsing_exception".to_string(),
    }]);

    let pipeline = pipeline_with(backend.clone(), sample_catalogue(), options());
    let report = pipeline.run().await.unwrap();

    assert!(report.swapped);
    assert_eq!(report.item_errors, 1);
    assert_eq!(report.processed, 3);
}

#[tokio::test]
async fn test_dry_run_builds_then_discards() {
    let backend = Arc::new(MockSearchBackend::new());
    backend.seed_index("products_2024_01_01_00_00_00", 4);
    backend.seed_alias("products_current", "products_2024_01_01_00_00_00");

    let pipeline = pipeline_with(
        backend.clone(),
        sample_catalogue(),
        options().with_dry_run(true),
    );
    let report = pipeline.run().await.unwrap();

    assert!(!report.swapped);
    assert_eq!(report.processed, 4);

    // Alias untouched, dry-run index removed
    assert_eq!(
        backend.alias_targets("products_current"),
        vec!["products_2024_01_01_00_00_00".to_string()]
    );
    assert_eq!(
        backend.index_names(),
        vec!["products_2024_01_01_00_00_00".to_string()]
    );
}

#[tokio::test]
async fn test_repeated_runs_converge_on_latest_index() {
    let backend = Arc::new(MockSearchBackend::new());

    let pipeline = pipeline_with(backend.clone(), sample_catalogue(), options());
    let first = pipeline.run().await.unwrap();

    // A second run may fall in the same second; its name then collides and
    // the pipeline recreates it, which is fine for this assertion.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let second = pipeline.run().await.unwrap();

    assert!(first.processed.abs_diff(second.processed) <= 10);
    assert_eq!(
        backend.alias_targets("products_current"),
        vec![second.index_name.clone()]
    );
}
