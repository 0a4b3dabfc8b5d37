//! Embedding client: cache + retries + dimension validation over a backend.

use std::sync::Arc;

use crate::cache::ContentCache;
use crate::error::{Error, Result};
use crate::types::EMBEDDING_DIMENSIONS;

use super::retry::with_retries;
use super::{EmbeddingBackend, DEFAULT_ATTEMPTS};

/// The embedding adapter the pipeline and retrieval service share.
///
/// Conversation embeddings are cached on disk by conversation id; query
/// embeddings are never cached (queries are one-shot by design).
pub struct EmbeddingClient {
    backend: Arc<dyn EmbeddingBackend>,
    cache: ContentCache,
}

impl EmbeddingClient {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, cache: ContentCache) -> Self {
        Self { backend, cache }
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn probe(&self) -> bool {
        self.backend.probe().await
    }

    /// Embed a conversation document, keyed by its id for caching.
    pub async fn embed_conversation(&self, conversation_id: &str, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.load_embedding(conversation_id) {
            if cached.len() == EMBEDDING_DIMENSIONS {
                return Ok(cached);
            }
        }

        let vector = self.embed(text).await?;
        self.cache.store_embedding(conversation_id, &vector);
        Ok(vector)
    }

    /// Embed a search query. Cache deliberately disabled.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput(
                "cannot embed empty text".to_string(),
            ));
        }

        with_retries("embedding", DEFAULT_ATTEMPTS, || async {
            let vector = self.backend.embed(text).await?;
            if vector.len() != EMBEDDING_DIMENSIONS {
                return Err(Error::Upstream(format!(
                    "provider returned a {}-dimensional vector, expected {}",
                    vector.len(),
                    EMBEDDING_DIMENSIONS
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(Error::Upstream(
                    "provider returned non-finite vector components".to_string(),
                ));
            }
            Ok(vector)
        })
        .await
    }
}
