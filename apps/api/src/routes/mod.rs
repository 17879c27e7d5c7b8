pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::qualification::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/backends", get(handlers::handle_list_backends))
        // Leads API
        .route("/api/v1/leads/analyze", post(handlers::handle_analyze_lead))
        .route("/api/v1/leads/batch", post(handlers::handle_batch))
        .with_state(state)
}
