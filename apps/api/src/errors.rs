use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::SelectionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Per-lead failures never reach this type; they are reported inside the
/// result body. Only request validation and backend selection fail a request.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] SelectionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Configuration(e @ SelectionError::UnknownProvider(_)) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_PROVIDER", e.to_string())
            }
            AppError::Configuration(e) => {
                tracing::warn!("Backend selection failed: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "BACKEND_UNAVAILABLE",
                    e.to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ProviderKind;

    #[test]
    fn test_status_codes() {
        let validation = AppError::Validation("leads cannot be empty".to_string());
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);

        let unknown = AppError::from(SelectionError::UnknownProvider("mistral".to_string()));
        assert_eq!(unknown.into_response().status(), StatusCode::BAD_REQUEST);

        let unavailable = AppError::from(SelectionError::Unavailable {
            provider: ProviderKind::OpenAi,
            requirement: ProviderKind::OpenAi.requirement(),
        });
        assert_eq!(
            unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
