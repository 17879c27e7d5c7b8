use std::sync::Arc;

use tokio::sync::watch;

use crate::config::Config;
use crate::llm_client::BackendFactory;
use crate::qualification::batch::BatchOptions;
use crate::qualification::processor::LeadProcessor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Workflow bound to the backend selected at start-up.
    pub processor: LeadProcessor,
    /// Builds adapters for per-request provider overrides and the backend listing.
    pub backends: Arc<dyn BackendFactory>,
    pub config: Config,
    pub batch: BatchOptions,
    /// Flips to `true` on shutdown; running batches stop starting new leads.
    pub shutdown: watch::Receiver<bool>,
}
