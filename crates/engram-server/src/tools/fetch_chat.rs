//! fetch_chat tool
//!
//! Full transcript retrieval by conversation id.

use serde::Deserialize;
use serde_json::Value;

use crate::state::AppState;

/// Input schema for the fetch_chat tool
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "conversation_id": {
                "type": "string",
                "description": "The ID of the conversation to fetch"
            }
        },
        "required": ["conversation_id"]
    })
}

#[derive(Debug, Deserialize)]
struct FetchChatArgs {
    conversation_id: String,
}

pub async fn execute(state: &AppState, args: Option<Value>) -> Result<String, String> {
    let args: FetchChatArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };

    let conversation = state
        .store
        .get_conversation(&args.conversation_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Conversation {} not found", args.conversation_id))?;

    let messages = state
        .store
        .get_messages(&args.conversation_id)
        .map_err(|e| e.to_string())?;

    let transcript = messages
        .iter()
        .map(|msg| format!("{}: {}", msg.role.as_str(), msg.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(format!(
        "Conversation: {title}\nID: {id}\nSummary: {summary}\nTopics: {topics}\nCluster: {cluster}\nMessages: {count}\nCreated: {created}\n\nTranscript:\n{transcript}",
        title = conversation.title,
        id = conversation.id,
        summary = conversation.summary.as_deref().unwrap_or("No summary available"),
        topics = if conversation.topics.is_empty() {
            "none".to_string()
        } else {
            conversation.topics.join(", ")
        },
        cluster = conversation.cluster_label.as_deref().unwrap_or("Unclustered"),
        count = conversation.message_count,
        created = conversation.created_at.to_rfc3339(),
        transcript = transcript,
    ))
}
