use catalog_search::{
    api::{build_router, AppState},
    backend::{OpenSearchBackend, SearchBackend},
    config::Config,
    enrichment::{DynamicDataProvider, HttpDynamicDataProvider, NoopDynamicDataProvider},
    health::HealthGate,
    indexer::{IndexerPipeline, PipelineOptions},
    service::{QueryService, ServiceOptions},
    store::{MySqlProductStore, ProductStore},
};
use clap::{Parser, Subcommand};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "catalog-search")]
#[command(about = "Product-catalog search service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP search service (default)
    Serve,

    /// Rebuild the search index and rotate the alias onto it
    Reindex {
        /// Build and validate the index but stop before the alias swap
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(2);
    });

    init_tracing(&config);

    tracing::info!("Starting catalog-search v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Reindex { dry_run } => reindex(config, dry_run).await,
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "catalog_search={},tower_http=info",
            config.observability.log_level
        ))
    });

    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend: Arc<dyn SearchBackend> = Arc::new(OpenSearchBackend::new(&config.search)?);
    let store: Arc<dyn ProductStore> = Arc::new(MySqlProductStore::connect(&config.database).await?);
    tracing::info!("Connected to relational store");

    let gate = HealthGate::new(
        backend.clone(),
        std::time::Duration::from_secs(config.search.health_timeout_secs),
    );

    let provider: Arc<dyn DynamicDataProvider> =
        match HttpDynamicDataProvider::new(&config.enrichment)? {
            Some(provider) => {
                tracing::info!("Dynamic-data enrichment enabled");
                Arc::new(provider)
            }
            None => {
                tracing::info!("Dynamic-data enrichment not configured; responses stay static");
                Arc::new(NoopDynamicDataProvider)
            }
        };

    let query_service = Arc::new(QueryService::new(
        backend,
        store,
        gate,
        provider,
        ServiceOptions::from_config(&config.search),
    ));

    let app = build_router(
        AppState::new(query_service),
        std::time::Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP API listening on http://{}", addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = server => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully");
    Ok(())
}

async fn reindex(config: Config, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let backend: Arc<dyn SearchBackend> = Arc::new(OpenSearchBackend::new(&config.search)?);
    let store: Arc<dyn ProductStore> = Arc::new(MySqlProductStore::connect(&config.database).await?);

    let options = PipelineOptions::from_config(&config).with_dry_run(dry_run);
    let pipeline = IndexerPipeline::new(backend, store, options);

    // An interrupt aborts between batches and tears down the partial index
    let shutdown = pipeline.shutdown_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; aborting reindex after the current batch");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    match pipeline.run().await {
        Ok(report) => {
            tracing::info!(
                index = %report.index_name,
                processed = report.processed,
                skipped = report.skipped,
                item_errors = report.item_errors,
                batches = report.batches,
                swapped = report.swapped,
                elapsed_secs = report.elapsed.as_secs(),
                "Reindex succeeded"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Reindex failed");
            std::process::exit(1);
        }
    }
}
