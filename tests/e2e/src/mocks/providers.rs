//! Deterministic in-process provider backends.
//!
//! `BagOfWordsEmbeddings` hashes lower-cased words into a fixed-dimension
//! bag, so texts that share vocabulary land close in cosine space and
//! search behaves meaningfully without any model. `ScriptedChat` replays a
//! canned response; `FailingEmbeddings` fails every call to exercise
//! per-item isolation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use engram_core::{ChatBackend, ChatRequest, EmbeddingBackend, Error, EMBEDDING_DIMENSIONS};

/// Word-hash embedding backend: deterministic, vocabulary-sensitive.
pub struct BagOfWordsEmbeddings {
    pub calls: AtomicU32,
}

impl BagOfWordsEmbeddings {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; EMBEDDING_DIMENSIONS];
        for word in text.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % EMBEDDING_DIMENSIONS;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        } else {
            vector[0] = 1.0;
        }
        vector
    }
}

impl Default for BagOfWordsEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for BagOfWordsEmbeddings {
    fn name(&self) -> &'static str {
        "mock-bag-of-words"
    }

    async fn embed(&self, text: &str) -> engram_core::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector_for(text))
    }

    async fn probe(&self) -> bool {
        true
    }
}

/// Embedding backend that always fails, for failure-isolation journeys.
pub struct FailingEmbeddings;

#[async_trait]
impl EmbeddingBackend for FailingEmbeddings {
    fn name(&self) -> &'static str {
        "mock-failing"
    }

    async fn embed(&self, _text: &str) -> engram_core::Result<Vec<f32>> {
        Err(Error::Upstream("mock embedder is down".to_string()))
    }

    async fn probe(&self) -> bool {
        false
    }
}

/// Chat backend replaying a canned response.
pub struct ScriptedChat {
    response: String,
    pub calls: AtomicU32,
}

impl ScriptedChat {
    /// A well-formed summariser response.
    pub fn summarizer() -> Self {
        Self::with_response(
            r#"{"summary": "A deterministic test conversation.", "topics": ["testing", "mocks"]}"#,
        )
    }

    pub fn with_response(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    fn name(&self) -> &'static str {
        "mock-scripted"
    }

    async fn complete(&self, _request: ChatRequest<'_>) -> engram_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }

    async fn probe(&self) -> bool {
        true
    }
}
