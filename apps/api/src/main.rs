mod config;
mod db;
mod errors;
mod extractor;
mod generation;
mod ledger;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::extractor::ToolExtractor;
use crate::generation::router::ProviderRouter;
use crate::ledger::{Ledger, LedgerQueue};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hired API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the application ledger and its background writer
    let pool = create_pool(&config.ledger_database_url).await?;
    let ledger = Ledger::new(pool);
    let (ledger_queue, _ledger_worker) = LedgerQueue::spawn(ledger.clone());

    // Initialize provider backends (only those with a credential)
    let router = ProviderRouter::from_credentials(&config.credentials, config.provider_timeout)
        .context("Failed to build provider HTTP client")?;
    let available = router.available();
    if available.is_empty() {
        warn!("No provider credentials configured; every generation request will fail");
    } else {
        info!("Providers available: {available:?}");
    }

    // Initialize the requirement extractor
    let extractor = Arc::new(ToolExtractor::new(
        config.extractor_command.clone(),
        config.extractor_timeout,
    ));
    info!(
        "Requirement extractor: '{}' (timeout {}s)",
        config.extractor_command,
        config.extractor_timeout.as_secs()
    );

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_allow_origin
                .parse::<HeaderValue>()
                .context("CORS_ALLOW_ORIGIN must be a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(tower_http::cors::Any);

    // Build app state
    let state = AppState {
        config: config.clone(),
        extractor,
        router,
        ledger,
        ledger_queue,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
