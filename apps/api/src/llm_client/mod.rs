/// LLM Client — the single point of entry for every generative-text call in the service.
///
/// ARCHITECTURAL RULE: No other module may talk to a model provider directly.
/// All generation MUST go through an `LlmBackend` chosen by `select_backend`.
///
/// Four interchangeable providers are supported. Each one captures its
/// configuration at construction time and reports itself unavailable instead of
/// failing when that configuration is missing; the failure only surfaces when
/// `generate` is called on it.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

pub mod anthropic;
pub mod gemini;
#[cfg(test)]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod prompts;

use anthropic::AnthropicBackend;
use gemini::GeminiBackend;
use ollama::OllamaBackend;
use openai::OpenAiBackend;

/// Request timeout for the hosted providers.
pub const CLOUD_TIMEOUT_SECS: u64 = 60;

/// Generation errors. Raised by `generate`; never by construction.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} not configured. {requirement}")]
    NotConfigured {
        provider: ProviderKind,
        requirement: &'static str,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("{provider} error: {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
    },

    #[error("Unexpected {provider} response: {detail}")]
    UnexpectedResponse {
        provider: ProviderKind,
        detail: String,
    },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Configuration errors raised while choosing a backend. Fatal to the caller.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Unknown LLM provider '{0}'. Expected one of: claude, openai, gemini, ollama")]
    UnknownProvider(String),

    #[error("LLM provider '{provider}' not available. {requirement}")]
    Unavailable {
        provider: ProviderKind,
        requirement: &'static str,
    },

    #[error("No LLM backend available! Please configure one:\n{}", format_requirements(.0))]
    NoneAvailable(Vec<ProviderKind>),
}

fn format_requirements(kinds: &[ProviderKind]) -> String {
    kinds
        .iter()
        .map(|k| format!("  - {}", k.requirement()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The capability every provider adapter implements.
///
/// Implementations hold no mutable per-call state; a single instance is shared
/// across concurrently running lead workflows.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Cloud providers: a credential is present. Local provider: the endpoint
    /// answered a liveness check at construction.
    fn is_available(&self) -> bool;

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Provider kinds
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    OpenAi,
    Gemini,
    Ollama,
}

impl ProviderKind {
    /// Auto-detection order.
    pub const PRIORITY: [ProviderKind; 4] = [
        ProviderKind::Claude,
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::Ollama,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// What an operator has to do to make this provider available.
    pub fn requirement(self) -> &'static str {
        match self {
            ProviderKind::Claude => "Claude: Set ANTHROPIC_API_KEY in .env",
            ProviderKind::OpenAi => "OpenAI: Set OPENAI_API_KEY in .env",
            ProviderKind::Gemini => "Gemini: Set GEMINI_API_KEY in .env",
            ProviderKind::Ollama => "Ollama: Run 'ollama serve' for local LLM",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "ollama" | "local" => Ok(ProviderKind::Ollama),
            _ => Err(SelectionError::UnknownProvider(s.to_string())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Settings captured from the environment
// ────────────────────────────────────────────────────────────────────────────

/// Credentials and endpoints for one hosted provider.
#[derive(Debug, Clone, Default)]
pub struct CloudSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Endpoint for the locally hosted provider.
#[derive(Debug, Clone)]
pub struct LocalSettings {
    pub base_url: String,
    pub model: String,
}

/// Provider configuration, read once from the process environment.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub claude: CloudSettings,
    pub openai: CloudSettings,
    pub gemini: CloudSettings,
    pub ollama: LocalSettings,
}

impl BackendSettings {
    pub fn from_env() -> Self {
        Self {
            claude: CloudSettings {
                api_key: env_opt("ANTHROPIC_API_KEY"),
                model: env_or("CLAUDE_MODEL", anthropic::DEFAULT_MODEL),
                base_url: env_or("ANTHROPIC_BASE_URL", anthropic::DEFAULT_BASE_URL),
            },
            openai: CloudSettings {
                api_key: env_opt("OPENAI_API_KEY"),
                model: env_or("OPENAI_MODEL", openai::DEFAULT_MODEL),
                base_url: env_or("OPENAI_BASE_URL", openai::DEFAULT_BASE_URL),
            },
            gemini: CloudSettings {
                api_key: env_opt("GEMINI_API_KEY").or_else(|| env_opt("GOOGLE_API_KEY")),
                model: env_or("GEMINI_MODEL", gemini::DEFAULT_MODEL),
                base_url: env_or("GEMINI_BASE_URL", gemini::DEFAULT_BASE_URL),
            },
            ollama: LocalSettings {
                base_url: env_or("OLLAMA_BASE_URL", ollama::DEFAULT_BASE_URL),
                model: env_or("OLLAMA_MODEL", ollama::DEFAULT_MODEL),
            },
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Builds a `reqwest::Client` with the given timeout.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .expect("Failed to build HTTP client")
}

/// Reads a non-2xx body and turns it into `LlmError::Api`, preferring the
/// provider's own `error.message` when the body carries one.
pub(crate) async fn api_error(response: reqwest::Response) -> LlmError {
    #[derive(serde::Deserialize)]
    struct Envelope {
        error: Body,
    }
    #[derive(serde::Deserialize)]
    struct Body {
        message: String,
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Envelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api { status, message }
}

// ────────────────────────────────────────────────────────────────────────────
// Construction and selection
// ────────────────────────────────────────────────────────────────────────────

/// Constructs provider adapters. Swapped for a fake in tests.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn build(&self, kind: ProviderKind) -> Arc<dyn LlmBackend>;
}

/// Production factory: builds adapters from `BackendSettings`.
pub struct EnvBackendFactory {
    settings: BackendSettings,
}

impl EnvBackendFactory {
    pub fn new(settings: BackendSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BackendFactory for EnvBackendFactory {
    async fn build(&self, kind: ProviderKind) -> Arc<dyn LlmBackend> {
        match kind {
            ProviderKind::Claude => Arc::new(AnthropicBackend::new(self.settings.claude.clone())),
            ProviderKind::OpenAi => Arc::new(OpenAiBackend::new(self.settings.openai.clone())),
            ProviderKind::Gemini => Arc::new(GeminiBackend::new(self.settings.gemini.clone())),
            ProviderKind::Ollama => {
                Arc::new(OllamaBackend::connect(self.settings.ollama.clone()).await)
            }
        }
    }
}

/// Chooses a backend.
///
/// Precedence:
/// 1. `explicit` names a provider → only that one is built and checked.
/// 2. `preference` (e.g. `LLM_PROVIDER`) → treated as if it were `explicit`.
/// 3. Otherwise the first available provider in `order` wins.
///
/// A named provider never falls through to another one.
pub async fn select_backend(
    explicit: Option<&str>,
    preference: Option<&str>,
    order: &[ProviderKind],
    factory: &dyn BackendFactory,
) -> Result<Arc<dyn LlmBackend>, SelectionError> {
    let named = explicit
        .filter(|s| !s.trim().is_empty())
        .or_else(|| preference.filter(|s| !s.trim().is_empty()));

    if let Some(name) = named {
        let kind: ProviderKind = name.parse()?;
        let backend = factory.build(kind).await;
        if backend.is_available() {
            info!("Using LLM backend: {kind}");
            return Ok(backend);
        }
        return Err(SelectionError::Unavailable {
            provider: kind,
            requirement: kind.requirement(),
        });
    }

    for &kind in order {
        let backend = factory.build(kind).await;
        if backend.is_available() {
            info!("Using LLM backend: {kind} (auto-detected)");
            return Ok(backend);
        }
        debug!("LLM backend {kind} not available, trying next");
    }

    Err(SelectionError::NoneAvailable(order.to_vec()))
}

/// Availability of one provider, as reported by `list_available_backends`.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub provider: ProviderKind,
    pub available: bool,
    pub requirement: &'static str,
}

/// Checks every provider in priority order.
pub async fn list_available_backends(factory: &dyn BackendFactory) -> Vec<BackendStatus> {
    let mut statuses = Vec::with_capacity(ProviderKind::PRIORITY.len());
    for kind in ProviderKind::PRIORITY {
        let backend = factory.build(kind).await;
        statuses.push(BackendStatus {
            provider: kind,
            available: backend.is_available(),
            requirement: kind.requirement(),
        });
    }
    statuses
}
