//! Axum route handlers for the Leads API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::{list_available_backends, select_backend, BackendStatus, ProviderKind};
use crate::models::lead::Lead;
use crate::qualification::batch::{process_batch_interruptible, BatchReport};
use crate::qualification::processor::LeadProcessor;
use crate::qualification::verdict::ProcessResult;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ProviderOverride {
    /// Forces a specific provider for this request. No fallback.
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub leads: Vec<Lead>,
}

#[derive(Debug, Serialize)]
pub struct BackendsResponse {
    pub active: ProviderKind,
    pub preferred: Option<String>,
    pub backends: Vec<BackendStatus>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/backends
///
/// Checks every provider. Useful to check credentials before a batch.
pub async fn handle_list_backends(State(state): State<AppState>) -> Json<BackendsResponse> {
    let backends = list_available_backends(state.backends.as_ref()).await;
    Json(BackendsResponse {
        active: state.processor.backend().kind(),
        preferred: state.config.llm_provider.clone(),
        backends,
    })
}

/// POST /api/v1/leads/analyze
///
/// Runs one lead through analysis and drafting. Per-lead failures come back as
/// an ERROR verdict with status `error`, not as an HTTP error.
pub async fn handle_analyze_lead(
    State(state): State<AppState>,
    Query(params): Query<ProviderOverride>,
    Json(lead): Json<Lead>,
) -> Result<Json<ProcessResult>, AppError> {
    let processor = resolve_processor(&state, params.provider.as_deref()).await?;
    Ok(Json(processor.process_lead(&lead).await))
}

/// POST /api/v1/leads/batch
///
/// Processes leads in input order. On shutdown the report comes back early
/// with `interrupted: true`.
pub async fn handle_batch(
    State(state): State<AppState>,
    Query(params): Query<ProviderOverride>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchReport>, AppError> {
    if request.leads.is_empty() {
        return Err(AppError::Validation("leads cannot be empty".to_string()));
    }

    let processor = resolve_processor(&state, params.provider.as_deref()).await?;
    let report = process_batch_interruptible(
        &processor,
        &request.leads,
        state.batch,
        state.shutdown.clone(),
    )
    .await;

    Ok(Json(report))
}

async fn resolve_processor(
    state: &AppState,
    provider: Option<&str>,
) -> Result<LeadProcessor, AppError> {
    match provider.filter(|p| !p.trim().is_empty()) {
        None => Ok(state.processor.clone()),
        Some(name) => {
            let backend = select_backend(
                Some(name),
                None,
                &ProviderKind::PRIORITY,
                state.backends.as_ref(),
            )
            .await?;
            Ok(state.processor.with_backend(backend))
        }
    }
}
