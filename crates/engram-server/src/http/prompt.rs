//! Prompt synthesis endpoint.

use std::time::Instant;

use axum::extract::State;
use axum::response::Json;
use engram_core::{ConversationContext, Error};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upper bound on how many conversations one prompt can draw from.
const MAX_CONVERSATIONS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct GeneratePromptRequest {
    pub conversation_ids: Vec<String>,
}

/// POST /api/prompt/generate — build a reusable system prompt from the
/// selected conversations' titles, topics, and summaries.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GeneratePromptRequest>,
) -> ApiResult<Json<Value>> {
    let started = Instant::now();

    if request.conversation_ids.is_empty() {
        return Err(ApiError(Error::EmptyInput(
            "conversation_ids must not be empty".to_string(),
        )));
    }
    if request.conversation_ids.len() > MAX_CONVERSATIONS {
        return Err(ApiError(Error::InvalidInput(format!(
            "at most {MAX_CONVERSATIONS} conversation ids are accepted"
        ))));
    }

    let conversations = state
        .store
        .get_conversations_by_ids(&request.conversation_ids)?;
    if conversations.is_empty() {
        return Err(ApiError(Error::NotFound(
            "Requested conversations".to_string(),
        )));
    }

    let contexts: Vec<ConversationContext> = conversations
        .into_iter()
        .map(|c| ConversationContext {
            title: c.title,
            topics: c.topics,
            summary: c.summary,
        })
        .collect();

    let prompt = state.prompt.synthesize(&contexts).await?;

    Ok(Json(json!({
        "prompt": prompt,
        "conversations_used": contexts.len(),
        "processing_time_ms": started.elapsed().as_secs_f64() * 1000.0,
    })))
}
