//! Summarisation client: conversation → {summary, topics} via the chat
//! provider, with JSON-format responses and per-id caching.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CachedSummary, ContentCache};
use crate::error::{Error, Result};
use crate::types::NormalizedMessage;

use super::retry::with_retries;
use super::{ChatBackend, ChatRequest, DEFAULT_ATTEMPTS, LONG_CALL_TIMEOUT};

/// At most this many topics survive.
const MAX_TOPICS: usize = 5;

/// Very long messages are cut before they reach the model.
const MAX_MESSAGE_CHARS: usize = 1000;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes AI chat conversations.\n\
Your task is to:\n\
1. Generate a concise 2-3 sentence summary of the conversation\n\
2. Extract 3-5 main topics or themes discussed\n\n\
Return your response as JSON with this exact structure:\n\
{\n  \"summary\": \"2-3 sentence summary here\",\n  \"topics\": [\"topic1\", \"topic2\", \"topic3\"]\n}\n\n\
Keep topics short (1-3 words each) and specific.\n\
Return ONLY valid JSON, no other text.";

/// Summariser output.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutput {
    pub summary: String,
    pub topics: Vec<String>,
}

/// The summarisation adapter.
pub struct Summarizer {
    backend: Arc<dyn ChatBackend>,
    cache: ContentCache,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn ChatBackend>, cache: ContentCache) -> Self {
        Self { backend, cache }
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn probe(&self) -> bool {
        self.backend.probe().await
    }

    /// Summarise a conversation. When `conversation_id` is known the result
    /// is cached on disk; the ingest pipeline summarises before ids exist
    /// and passes `None`.
    pub async fn summarize(
        &self,
        conversation_id: Option<&str>,
        messages: &[NormalizedMessage],
    ) -> Result<SummaryOutput> {
        if messages.is_empty() {
            return Err(Error::EmptyInput("cannot summarize zero messages".to_string()));
        }

        if let Some(id) = conversation_id {
            if let Some(cached) = self.cache.load_summary(id) {
                debug!("Summary cache hit for {}", id);
                return Ok(SummaryOutput {
                    summary: cached.summary,
                    topics: cached.topics,
                });
            }
        }

        let transcript = format_conversation(messages);
        let user_prompt = format!(
            "Analyze this conversation and provide a summary and topics:\n\n{}\n\n\
             Return ONLY valid JSON with \"summary\" and \"topics\" fields.",
            transcript
        );

        let output = with_retries("summarization", DEFAULT_ATTEMPTS, || async {
            let raw = self
                .backend
                .complete(ChatRequest {
                    system: SYSTEM_PROMPT,
                    user: &user_prompt,
                    json: true,
                    temperature: 0.3,
                    max_tokens: 500,
                    timeout: LONG_CALL_TIMEOUT,
                })
                .await?;
            parse_summary_response(&raw)
        })
        .await?;

        if let Some(id) = conversation_id {
            self.cache.store_summary(
                id,
                &CachedSummary {
                    summary: output.summary.clone(),
                    topics: output.topics.clone(),
                },
            );
        }

        Ok(output)
    }

    /// Write a generated summary into the cache after the id exists.
    pub fn remember(&self, conversation_id: &str, output: &SummaryOutput) {
        self.cache.store_summary(
            conversation_id,
            &CachedSummary {
                summary: output.summary.clone(),
                topics: output.topics.clone(),
            },
        );
    }
}

/// The deterministic fallback used when summarisation permanently fails.
pub(crate) fn fallback_summary(message_count: i64) -> SummaryOutput {
    SummaryOutput {
        summary: format!("Conversation with {} messages", message_count),
        topics: vec![],
    }
}

fn format_conversation(messages: &[NormalizedMessage]) -> String {
    messages
        .iter()
        .map(|msg| {
            let content = if msg.content.chars().count() > MAX_MESSAGE_CHARS {
                let head: String = msg.content.chars().take(MAX_MESSAGE_CHARS - 3).collect();
                format!("{}...", head)
            } else {
                msg.content.clone()
            };
            format!("{}: {}", msg.role.as_str().to_uppercase(), content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn parse_summary_response(raw: &str) -> Result<SummaryOutput> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Error::Upstream(format!("summariser returned invalid JSON: {e}")))?;

    let summary = value["summary"]
        .as_str()
        .ok_or_else(|| Error::Upstream("summariser response missing 'summary'".to_string()))?
        .trim()
        .to_string();

    let mut topics: Vec<String> = match &value["topics"] {
        Value::Array(items) => items
            .iter()
            .filter_map(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .take(MAX_TOPICS)
            .collect(),
        Value::String(single) => vec![single.trim().to_string()],
        _ => vec![],
    };

    if topics.is_empty() {
        topics = vec!["General Discussion".to_string()];
    }

    Ok(SummaryOutput { summary, topics })
}
