//! Provider Adapters
//!
//! Retrying HTTP callers for the external summarisation, embedding, prompt
//! synthesis, and relevance-gate endpoints. Each concern sits behind a
//! trait ([`EmbeddingBackend`] / [`ChatBackend`]) so tests can substitute
//! deterministic implementations; the concrete backends route to either a
//! hosted API or a local Ollama instance per [`ProviderKind`].

mod backends;
mod embedder;
mod gate;
mod prompt;
mod retry;
mod summarizer;

pub use backends::{GroqChat, HuggingFaceEmbeddings, OllamaChat, OllamaEmbeddings};
pub use embedder::EmbeddingClient;
pub use gate::{GateVerdict, RelevanceGate};
pub use prompt::{ConversationContext, PromptSynthesizer};
pub use summarizer::{Summarizer, SummaryOutput};

pub(crate) use summarizer::fallback_summary;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::Result;

/// Deadline for short calls (embeddings, gate checks).
pub const SHORT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for long calls (summaries, prompt synthesis).
pub const LONG_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Default bounded retry attempts for summariser and embedder calls.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// A text → vector transform.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Provider name for logs and health reporting.
    fn name(&self) -> &'static str;

    /// Embed one text. A single attempt; retries live in the client.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Cheap readiness check for the health endpoint.
    async fn probe(&self) -> bool;
}

/// One chat-completion request.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    /// Ask the backend for a JSON-object response where supported.
    pub json: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// A chat-completion provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run one completion and return the raw content string.
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String>;

    async fn probe(&self) -> bool;
}

/// Build the embedding backend the settings route to.
pub fn build_embedding_backend(settings: &ProviderSettings) -> Arc<dyn EmbeddingBackend> {
    match settings.embedding_provider {
        ProviderKind::Cloud => Arc::new(HuggingFaceEmbeddings::new(
            settings.hf_api_token.clone().unwrap_or_default(),
            settings.hf_embedding_model.clone(),
        )),
        ProviderKind::Local => Arc::new(OllamaEmbeddings::new(
            settings.ollama_base_url.clone(),
            settings.ollama_embedding_model.clone(),
        )),
    }
}

/// Build the chat backend the settings route to.
pub fn build_chat_backend(settings: &ProviderSettings) -> Arc<dyn ChatBackend> {
    match settings.chat_provider {
        ProviderKind::Cloud => Arc::new(GroqChat::new(
            settings.groq_api_key.clone().unwrap_or_default(),
            settings.groq_model.clone(),
        )),
        ProviderKind::Local => Arc::new(OllamaChat::new(
            settings.ollama_base_url.clone(),
            settings.ollama_model.clone(),
        )),
    }
}
