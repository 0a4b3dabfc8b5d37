//! Text Composition
//!
//! Pure functions that turn a conversation into the two text artifacts the
//! system embeds and indexes:
//!
//! - the embedding input (title, topics, summary, budgeted message content)
//! - the searchable index document (role-tagged message transcript head)

use crate::types::NormalizedMessage;

/// Total character budget for message content in the embedding input.
pub const EMBED_CONTENT_BUDGET: usize = 2000;

/// A partial final message is only included if at least this much budget
/// remains; shorter tails add noise without signal.
const MIN_PARTIAL_CHARS: usize = 100;

/// How many messages the index document includes.
const DOCUMENT_MESSAGE_LIMIT: usize = 20;

/// Per-message character cap in the index document.
const DOCUMENT_MESSAGE_CHARS: usize = 500;

/// Compose the canonical embedding input for a conversation.
///
/// Sections appear in a fixed order (title, topics, summary, content) and
/// are joined by blank lines. Message content is concatenated until
/// [`EMBED_CONTENT_BUDGET`] characters are reached; a partial final message
/// is included only when at least 100 characters of budget remain, suffixed
/// with an ellipsis.
pub fn prepare_text_for_embedding(
    title: &str,
    summary: &str,
    topics: &[String],
    messages: &[NormalizedMessage],
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !title.is_empty() {
        parts.push(format!("Title: {}", title));
    }

    if !topics.is_empty() {
        parts.push(format!("Topics: {}", topics.join(", ")));
    }

    if !summary.is_empty() {
        parts.push(format!("Summary: {}", summary));
    }

    let mut content_parts: Vec<String> = Vec::new();
    let mut used = 0usize;
    for msg in messages {
        let len = msg.content.chars().count();
        if used + len > EMBED_CONTENT_BUDGET {
            let remaining = EMBED_CONTENT_BUDGET - used;
            if remaining > MIN_PARTIAL_CHARS {
                let partial: String = msg.content.chars().take(remaining).collect();
                content_parts.push(format!("{}...", partial));
            }
            break;
        }
        content_parts.push(msg.content.clone());
        used += len;
    }

    if !content_parts.is_empty() {
        parts.push(format!("Content: {}", content_parts.join(" ")));
    }

    parts.join("\n\n")
}

/// Compose the searchable document stored in the vector index.
///
/// Header lines carry title, summary, and topics; the body is the first
/// [`DOCUMENT_MESSAGE_LIMIT`] messages, role-tagged in upper case and each
/// truncated to [`DOCUMENT_MESSAGE_CHARS`] characters.
pub fn compose_document(
    title: &str,
    summary: &str,
    topics: &[String],
    messages: &[NormalizedMessage],
) -> String {
    let mut messages_text = String::new();
    for msg in messages.iter().take(DOCUMENT_MESSAGE_LIMIT) {
        let content: String = msg.content.chars().take(DOCUMENT_MESSAGE_CHARS).collect();
        messages_text.push_str(&format!(
            "\n{}: {}",
            msg.role.as_str().to_uppercase(),
            content
        ));
    }

    format!(
        "Title: {}\nSummary: {}\nTopics: {}\n{}",
        title,
        summary,
        topics.join(", "),
        messages_text
    )
}

/// First `max_chars` characters of a document, with an ellipsis when
/// truncated. Used for search snippets and tool previews.
pub fn snippet(document: &str, max_chars: usize) -> String {
    let truncated: String = document.chars().take(max_chars).collect();
    if truncated.chars().count() < document.chars().count() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}
