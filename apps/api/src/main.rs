mod config;
mod errors;
mod llm_client;
mod models;
mod qualification;
mod reference;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::{select_backend, BackendSettings, EnvBackendFactory, ProviderKind};
use crate::qualification::batch::BatchOptions;
use crate::qualification::processor::LeadProcessor;
use crate::reference::ReferenceContext;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Leads API v{}", env!("CARGO_PKG_VERSION"));

    // Reference context (company, audience, pain points)
    let reference = Arc::new(ReferenceContext::load(&config.leads_config_dir)?);

    // Select the LLM backend: LLM_PROVIDER if set, else first available
    let factory = Arc::new(EnvBackendFactory::new(BackendSettings::from_env()));
    let backend = select_backend(
        None,
        config.llm_provider.as_deref(),
        &ProviderKind::PRIORITY,
        factory.as_ref(),
    )
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Build app state
    let state = AppState {
        processor: LeadProcessor::new(backend, reference),
        backends: factory,
        config: config.clone(),
        batch: BatchOptions {
            concurrency: config.batch_concurrency,
        },
        shutdown: shutdown_rx,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C and tells running batches to stop taking new leads.
async fn shutdown_signal(stop: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C, graceful shutdown disabled: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, finishing in-flight leads");
    stop.send_replace(true);
}
