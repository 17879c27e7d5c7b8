//! Test double for `LlmBackend` — replies through a closure and counts calls.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{LlmBackend, LlmError, ProviderKind};

type Responder = dyn Fn(&str, Option<&str>) -> Result<String, LlmError> + Send + Sync;

pub struct MockBackend {
    kind: ProviderKind,
    available: bool,
    responder: Box<Responder>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, Option<&str>) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            kind: ProviderKind::Claude,
            available: true,
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always returns `text`.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    /// Always fails with an HTTP-layer style error.
    pub fn failing(status: u16, message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_, _| {
            Err(LlmError::Api {
                status,
                message: message.clone(),
            })
        })
    }

    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(LlmError::NotConfigured {
                provider: self.kind,
                requirement: self.kind.requirement(),
            });
        }
        (self.responder)(prompt, system)
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
