//! Prompt synthesis: selected conversations → one reusable system prompt.

use std::sync::Arc;

use crate::error::{Error, Result};

use super::retry::with_retries;
use super::{ChatBackend, ChatRequest, DEFAULT_ATTEMPTS, LONG_CALL_TIMEOUT};

const SYSTEM_PROMPT: &str = "You are an expert prompt engineer. The user will give you summaries of \
their previous AI conversations. Your job is to write a single, clear \
system prompt that a user can paste at the start of a new chat session \
so the assistant has all the relevant background.\n\n\
Guidelines:\n\
- Speak in second person (\"You are an assistant that...\").\n\
- Weave the key facts, decisions, and preferences from the summaries into the prompt naturally.\n\
- Keep it between 150-400 words - concise but thorough.\n\
- Do NOT include JSON, code fences, or markdown headers.\n\
- Output ONLY the system prompt text, nothing else.";

/// One conversation's contribution to the context block.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub title: String,
    pub topics: Vec<String>,
    pub summary: Option<String>,
}

/// Thin orchestrator over the chat provider; no state beyond the backend.
pub struct PromptSynthesizer {
    backend: Arc<dyn ChatBackend>,
}

impl PromptSynthesizer {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Generate a system prompt from the given conversations.
    pub async fn synthesize(&self, conversations: &[ConversationContext]) -> Result<String> {
        if conversations.is_empty() {
            return Err(Error::EmptyInput(
                "no conversations to synthesize from".to_string(),
            ));
        }

        let context_block = conversations
            .iter()
            .map(|c| {
                let topics = if c.topics.is_empty() {
                    "general".to_string()
                } else {
                    c.topics.join(", ")
                };
                format!(
                    "Title: {}\nTopics: {}\nSummary: {}",
                    c.title,
                    topics,
                    c.summary.as_deref().unwrap_or("No summary available")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        let user_prompt = format!(
            "Here are summaries of conversations the user wants to carry forward:\n\n\
             {}\n\nWrite the system prompt now.",
            context_block
        );

        with_retries("prompt synthesis", DEFAULT_ATTEMPTS, || async {
            self.backend
                .complete(ChatRequest {
                    system: SYSTEM_PROMPT,
                    user: &user_prompt,
                    json: false,
                    temperature: 0.5,
                    max_tokens: 800,
                    timeout: LONG_CALL_TIMEOUT,
                })
                .await
        })
        .await
    }
}
