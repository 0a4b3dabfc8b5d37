//! Conversation Normalisation
//!
//! Cleans parsed conversations into the canonical shape the pipeline
//! persists: whitespace-collapsed non-empty messages with validated roles
//! and dense sequence numbers, a title (derived from the first user message
//! when the export carried none), and a creation timestamp.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::types::{
    MessageRole, NormalizedConversation, NormalizedMessage, ParsedConversation, MAX_TITLE_CHARS,
};

/// Titles the exports use when the user never named a conversation.
const TITLE_SENTINEL: &str = "Untitled";

/// Derived titles take this many characters of the first user message.
const DERIVED_TITLE_CHARS: usize = 50;

/// Normalise one parsed conversation.
///
/// Returns [`Error::EmptyInput`] when no valid messages survive cleaning.
pub fn normalize_conversation(parsed: &ParsedConversation) -> Result<NormalizedConversation> {
    let mut messages: Vec<NormalizedMessage> = Vec::new();

    for raw in &parsed.messages {
        let Some(role) = MessageRole::parse(&raw.role) else {
            continue;
        };
        let content = collapse_whitespace(&raw.content);
        if content.is_empty() {
            continue;
        }
        messages.push(NormalizedMessage {
            role,
            content,
            sequence_number: messages.len() as i64,
        });
    }

    if messages.is_empty() {
        return Err(Error::EmptyInput(
            "no valid messages after cleaning".to_string(),
        ));
    }

    let title = derive_title(parsed.title.as_deref(), &messages);
    let created_at = parse_timestamp(parsed.timestamp.as_deref());
    let user_message_count = messages.iter().filter(|m| m.role == MessageRole::User).count();
    let assistant_message_count = messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .count();

    Ok(NormalizedConversation {
        title,
        message_count: messages.len() as i64,
        messages,
        created_at,
        user_message_count,
        assistant_message_count,
    })
}

fn collapse_whitespace(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep a real export title; otherwise take the head of the first user
/// message, with an ellipsis when cut.
fn derive_title(existing: Option<&str>, messages: &[NormalizedMessage]) -> String {
    if let Some(existing) = existing {
        let trimmed = existing.trim();
        if !trimmed.is_empty() && trimmed != TITLE_SENTINEL {
            return trimmed.chars().take(MAX_TITLE_CHARS).collect();
        }
    }

    let Some(first_user) = messages.iter().find(|m| m.role == MessageRole::User) else {
        return "Untitled Conversation".to_string();
    };

    let content = &first_user.content;
    if content.chars().count() > DERIVED_TITLE_CHARS {
        let head: String = content.chars().take(DERIVED_TITLE_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        content.clone()
    }
}

/// Parse an export timestamp, falling back to now for anything unreadable.
fn parse_timestamp(value: Option<&str>) -> DateTime<Utc> {
    let Some(value) = value else {
        return Utc::now();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.with_timezone(&Utc);
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
    for fmt in datetime_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return naive.and_utc();
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return naive.and_utc();
        }
    }

    Utc::now()
}
