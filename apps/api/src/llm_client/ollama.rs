//! Ollama adapter for a locally hosted model.
//!
//! Availability is a live check of `/api/tags` taken once at construction.
//! Generation goes through `/api/chat` so system and user turns stay separate.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{http_client, LocalSettings, LlmBackend, LlmError, ProviderKind};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";

/// Local hardware is slow on long prompts.
pub const LOCAL_TIMEOUT_SECS: u64 = 300;
const PING_TIMEOUT: Duration = Duration::from_secs(2);
/// Low temperature keeps structured output stable.
const TEMPERATURE: f32 = 0.1;
const CONTEXT_WINDOW: u32 = 8192;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_ctx: u32,
}

/// Pulls the generated text out of an `/api/chat` body.
///
/// `{"message": {"content": ..}}` is the success shape; a top-level `error`
/// field is the server reporting a failure inside a normal-looking body.
fn normalize_chat_body(body: Value) -> Result<String, LlmError> {
    if let Some(message) = body.get("message") {
        return message
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::UnexpectedResponse {
                provider: ProviderKind::Ollama,
                detail: "message without content".to_string(),
            });
    }

    if let Some(error) = body.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(LlmError::Provider {
            provider: ProviderKind::Ollama,
            message,
        });
    }

    let keys = body
        .as_object()
        .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_else(|| "<not an object>".to_string());
    Err(LlmError::UnexpectedResponse {
        provider: ProviderKind::Ollama,
        detail: format!("keys [{keys}]"),
    })
}

pub struct OllamaBackend {
    client: Client,
    settings: LocalSettings,
    available: bool,
}

impl OllamaBackend {
    /// Builds the adapter and pings the local endpoint once.
    pub async fn connect(settings: LocalSettings) -> Self {
        let settings = LocalSettings {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model,
        };
        let client = http_client(LOCAL_TIMEOUT_SECS);
        let available = ping(&client, &settings.base_url).await;
        if available {
            debug!("Ollama reachable at {}", settings.base_url);
        }
        Self {
            client,
            settings,
            available,
        }
    }
}

async fn ping(client: &Client, base_url: &str) -> bool {
    let url = format!("{base_url}/api/tags");
    match client.get(&url).timeout(PING_TIMEOUT).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            debug!("Ollama ping failed: {e}");
            false
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        if !self.available {
            return Err(LlmError::NotConfigured {
                provider: ProviderKind::Ollama,
                requirement: ProviderKind::Ollama.requirement(),
            });
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request_body = ChatRequest {
            model: &self.settings.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: TEMPERATURE,
                num_ctx: CONTEXT_WINDOW,
            },
        };

        let url = format!("{}/api/chat", self.settings.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!("Ollama request timed out after {LOCAL_TIMEOUT_SECS}s");
                }
                LlmError::Http(e)
            })?;

        // Ollama reports most failures as `{"error": ".."}` with a non-2xx
        // status, so the body is inspected before the status.
        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => normalize_chat_body(body),
            Err(_) if !status.is_success() => Err(LlmError::Api {
                status: status.as_u16(),
                message: text,
            }),
            Err(e) => Err(LlmError::UnexpectedResponse {
                provider: ProviderKind::Ollama,
                detail: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::spawn_stub;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    fn settings(base_url: &str) -> LocalSettings {
        LocalSettings {
            base_url: base_url.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    fn tags_route() -> Router {
        Router::new().route("/api/tags", get(|| async { Json(json!({"models": []})) }))
    }

    #[test]
    fn test_normalize_unwraps_message_content() {
        let body = json!({"model": "llama3", "message": {"role": "assistant", "content": "hello"}});
        assert_eq!(normalize_chat_body(body).unwrap(), "hello");
    }

    #[test]
    fn test_normalize_surfaces_embedded_error() {
        let body = json!({"error": "model 'llama3' not found"});
        let err = normalize_chat_body(body).unwrap_err();
        assert!(matches!(err, LlmError::Provider { ref message, .. } if message == "model 'llama3' not found"));
    }

    #[test]
    fn test_normalize_rejects_unknown_shape() {
        let body = json!({"response": "legacy generate shape"});
        let err = normalize_chat_body(body).unwrap_err();
        assert!(err.to_string().contains("response"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let backend = OllamaBackend::connect(settings("http://127.0.0.1:9")).await;
        assert!(!backend.is_available());
        let err = backend.generate("hi", None).await.unwrap_err();
        assert!(err.to_string().contains("ollama serve"));
    }

    #[tokio::test]
    async fn test_ping_requires_success_status() {
        let router = Router::new().route(
            "/api/tags",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = spawn_stub(router).await;
        let backend = OllamaBackend::connect(settings(&base)).await;
        assert!(!backend.is_available());
    }

    #[tokio::test]
    async fn test_generate_sends_low_temperature_chat_request() {
        let router = tags_route().route(
            "/api/chat",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["stream"], false);
                assert_eq!(body["options"]["num_ctx"], 8192);
                assert!(body["options"]["temperature"].as_f64().unwrap() < 0.2);
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["role"], "user");
                Json(json!({"message": {"role": "assistant", "content": "{\"score\": \"B\"}"}}))
            }),
        );
        let base = spawn_stub(router).await;
        let backend = OllamaBackend::connect(settings(&format!("{base}/"))).await;
        assert!(backend.is_available());

        let text = backend.generate("analyze", Some("system")).await.unwrap();
        assert_eq!(text, "{\"score\": \"B\"}");
    }

    #[tokio::test]
    async fn test_error_payload_with_error_status_is_provider_error() {
        let router = tags_route().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"error": "model not found, try pulling it first"})),
                )
            }),
        );
        let base = spawn_stub(router).await;
        let backend = OllamaBackend::connect(settings(&base)).await;

        let err = backend.generate("analyze", None).await.unwrap_err();
        assert!(matches!(err, LlmError::Provider { .. }));
        assert!(err.to_string().contains("try pulling it first"));
    }

    #[tokio::test]
    async fn test_plain_text_failure_is_api_error() {
        let router = tags_route().route(
            "/api/chat",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = spawn_stub(router).await;
        let backend = OllamaBackend::connect(settings(&base)).await;

        let err = backend.generate("analyze", None).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 502, .. }));
    }
}
