use std::sync::Arc;
use triage_pipeline::{
    api::{build_router, AppState},
    classification::{CachedCategorySource, ContextRetriever},
    config::Config,
    enrichment::EnrichmentScheduler,
    escalation::RecordEscalationHandler,
    oracles::HttpOracleClient,
    storage::{InMemoryTriageStore, InMemoryWatchlistStore},
    ticketing::HttpTicketingClient,
    triage::{TriageProcessor, TriageStorage},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        default_config()
    });

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "triage_pipeline=info,tower_http=info".into());
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

    tracing::info!("Starting triage pipeline v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Ticketing platform: {}", config.ticketing.base_url);

    // External clients
    let ticketing = Arc::new(HttpTicketingClient::from_config(&config.ticketing)?);
    tracing::info!("✅ Ticketing client initialized");

    let oracle = Arc::new(HttpOracleClient::from_config(&config.oracles)?);
    tracing::info!("✅ Oracle client initialized");

    let category_source = Arc::new(CachedCategorySource::from_config(&config.ticketing)?);
    tracing::info!("✅ Category taxonomy cache initialized");

    // Storage
    let triage_store = Arc::new(InMemoryTriageStore::new());
    let watchlist = Arc::new(InMemoryWatchlistStore::new());
    tracing::info!("✅ In-memory stores initialized");

    // Pipeline components
    let retriever = ContextRetriever::new(
        category_source,
        ticketing.clone(),
        config.classification.category_max_age_hours,
    );

    let escalation = RecordEscalationHandler::new(
        ticketing.clone(),
        watchlist.clone(),
        config.enrichment.enabled,
    );

    let processor = Arc::new(TriageProcessor::new(
        TriageStorage::new(triage_store),
        retriever,
        oracle.clone(),
        ticketing,
        escalation,
    ));
    tracing::info!("✅ Triage processor initialized");

    let scheduler = Arc::new(EnrichmentScheduler::new(
        watchlist.clone(),
        oracle,
        config.enrichment.clone(),
    ));
    if config.enrichment.enabled {
        tracing::info!(
            batch_size = config.enrichment.effective_batch_size(),
            quiet_window_minutes = config.enrichment.effective_quiet_window_minutes(),
            "✅ Enrichment scheduler initialized"
        );
    } else {
        tracing::info!("⚠️  Enrichment watchlist disabled in configuration");
    }

    // HTTP server
    let app = build_router(AppState::new(processor, scheduler, watchlist));
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Case intake: http://{}/v1/cases", http_addr);
    tracing::info!("   Enrichment trigger: http://{}/v1/enrichment/run", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Configuration built from the embedded defaults only
fn default_config() -> Config {
    config::Config::builder()
        .add_source(config::File::from_str(
            include_str!("../config/default.toml"),
            config::FileFormat::Toml,
        ))
        .build()
        .and_then(|c| c.try_deserialize())
        .expect("embedded default configuration is valid")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
