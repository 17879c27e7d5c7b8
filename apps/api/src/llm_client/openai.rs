//! OpenAI Chat Completions adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{api_error, http_client, CloudSettings, LlmBackend, LlmError, ProviderKind};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Hosted chat model with role-separated system/user messages.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    settings: CloudSettings,
}

impl OpenAiBackend {
    pub fn new(settings: CloudSettings) -> Self {
        Self {
            client: http_client(super::CLOUD_TIMEOUT_SECS),
            settings,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn is_available(&self) -> bool {
        self.settings.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(LlmError::NotConfigured {
                provider: ProviderKind::OpenAi,
                requirement: ProviderKind::OpenAi.requirement(),
            })?;

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
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::spawn_stub;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn settings(base_url: &str) -> CloudSettings {
        CloudSettings {
            api_key: Some("sk-openai".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_sends_system_then_user() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-openai");
                let roles: Vec<String> = body["messages"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|m| m["role"].as_str().unwrap().to_string())
                    .collect();
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": roles.join(",")}}]
                }))
            }),
        );
        let base = spawn_stub(router).await;
        let backend = OpenAiBackend::new(settings(&base));

        let text = backend.generate("prompt", Some("system")).await.unwrap();
        assert_eq!(text, "system,user");
    }

    #[tokio::test]
    async fn test_generate_without_system_sends_only_user() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let count = body["messages"].as_array().unwrap().len();
                Json(json!({"choices": [{"message": {"content": count.to_string()}}]}))
            }),
        );
        let base = spawn_stub(router).await;
        let backend = OpenAiBackend::new(settings(&base));

        assert_eq!(backend.generate("prompt", None).await.unwrap(), "1");
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let base = spawn_stub(router).await;
        let backend = OpenAiBackend::new(settings(&base));

        let err = backend.generate("prompt", None).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, ref message } if message == "overloaded"));
    }

    #[tokio::test]
    async fn test_null_content_is_empty_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": [{"message": {"content": null}}]})) }),
        );
        let base = spawn_stub(router).await;
        let backend = OpenAiBackend::new(settings(&base));

        let err = backend.generate("prompt", None).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[test]
    fn test_unavailable_without_api_key() {
        let backend = OpenAiBackend::new(CloudSettings {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        });
        assert!(!backend.is_available());
    }
}
