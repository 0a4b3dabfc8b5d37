//! Relevance gate: an optional LLM judgement over (query, result) pairs.
//!
//! The gate fails open. A provider error, a malformed response, or a
//! disabled gate all let the item through; only an explicit negative
//! verdict (or confidence under the threshold) suppresses a result.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{ChatBackend, ChatRequest, SHORT_CALL_TIMEOUT};

const SYSTEM_PROMPT: &str = "You judge whether a retrieved conversation is relevant to a search query.\n\
Return ONLY valid JSON: {\"is_relevant\": bool, \"confidence\": number between 0 and 1, \"reason\": \"short explanation\"}";

/// Gate output for one (query, item) pair.
#[derive(Debug, Clone, Deserialize)]
pub struct GateVerdict {
    pub is_relevant: bool,
    pub confidence: f32,
    #[serde(default)]
    pub reason: String,
}

/// The relevance gate adapter. Single attempt, no retries.
pub struct RelevanceGate {
    backend: Arc<dyn ChatBackend>,
    threshold: f32,
}

impl RelevanceGate {
    pub fn new(backend: Arc<dyn ChatBackend>, threshold: f32) -> Self {
        Self { backend, threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether an item survives the gate. Errors allow the item through.
    pub async fn allows(&self, query: &str, title: &str, summary: &str) -> bool {
        match self.check(query, title, summary).await {
            Some(verdict) => {
                let keep = verdict.is_relevant && verdict.confidence >= self.threshold;
                if !keep {
                    debug!(
                        confidence = verdict.confidence,
                        reason = %verdict.reason,
                        "Gate dropped '{}'",
                        title
                    );
                }
                keep
            }
            // fail open
            None => true,
        }
    }

    /// Raw gate verdict; `None` on any provider or parse failure.
    pub async fn check(&self, query: &str, title: &str, summary: &str) -> Option<GateVerdict> {
        let user_prompt = format!(
            "Query: {}\n\nCandidate conversation:\nTitle: {}\nSummary: {}\n\nIs this relevant?",
            query, title, summary
        );

        let raw = self
            .backend
            .complete(ChatRequest {
                system: SYSTEM_PROMPT,
                user: &user_prompt,
                json: true,
                temperature: 0.0,
                max_tokens: 200,
                timeout: SHORT_CALL_TIMEOUT,
            })
            .await
            .map_err(|e| debug!("Gate call failed (allowing item): {}", e))
            .ok()?;

        serde_json::from_str::<GateVerdict>(&raw)
            .map_err(|e| debug!("Gate response unparseable (allowing item): {}", e))
            .ok()
            .map(|mut verdict| {
                verdict.confidence = verdict.confidence.clamp(0.0, 1.0);
                verdict
            })
    }
}
