//! Core Entity Types
//!
//! Conversations, messages, and embedding records as persisted by the
//! metadata store, plus the intermediate parsed/normalised shapes that flow
//! through the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Corpus-wide embedding dimension. Mixed-dimension ingestion is rejected.
pub const EMBEDDING_DIMENSIONS: usize = 768;

/// Cluster id sentinel for conversations the projector has not yet seen.
pub const UNCLUSTERED: i64 = -1;

/// Maximum stored title length in characters.
pub const MAX_TITLE_CHARS: usize = 200;

// ============================================================================
// MESSAGE ROLE
// ============================================================================

/// Role of a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }

    /// Parse a role string; unknown roles yield `None` and are dropped
    /// during normalisation.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "user" | "human" => Some(MessageRole::User),
            "assistant" | "ai" => Some(MessageRole::Assistant),
            "system" => Some(MessageRole::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PERSISTED ENTITIES
// ============================================================================

/// A stored conversation with its enrichment metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub topics: Vec<String>,
    /// [`UNCLUSTERED`] until the first successful projection run.
    pub cluster_id: i64,
    pub cluster_label: Option<String>,
    pub message_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single role-tagged message. Immutable after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Dense, strictly increasing from 0 within a conversation.
    pub sequence_number: i64,
    pub created_at: DateTime<Utc>,
}

/// High-dimensional embedding plus projected visualisation coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub conversation_id: String,
    /// [`EMBEDDING_DIMENSIONS`]-long dense vector.
    pub vector: Vec<f32>,
    /// Projected 3-D point (origin until the first projection run).
    pub position: [f32; 3],
    /// Animation start point, fixed at the origin.
    pub start_position: [f32; 3],
    /// Euclidean norm of `position`.
    pub magnitude: f32,
}

impl EmbeddingRecord {
    /// New record at the origin, awaiting projection.
    pub fn new(conversation_id: String, vector: Vec<f32>) -> Self {
        Self {
            conversation_id,
            vector,
            position: [0.0; 3],
            start_position: [0.0; 3],
            magnitude: 0.0,
        }
    }
}

// ============================================================================
// PIPELINE SHAPES
// ============================================================================

/// Raw parser output: one conversation as found in the export, before any
/// cleaning. Roles are untrusted strings at this stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConversation {
    pub title: Option<String>,
    pub timestamp: Option<String>,
    pub messages: Vec<ParsedMessage>,
}

/// Raw parser output for a single message.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub role: String,
    pub content: String,
}

/// A cleaned message with a validated role and dense sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub role: MessageRole,
    pub content: String,
    pub sequence_number: i64,
}

/// A conversation after normalisation, ready for enrichment.
#[derive(Debug, Clone)]
pub struct NormalizedConversation {
    pub title: String,
    pub messages: Vec<NormalizedMessage>,
    pub message_count: i64,
    pub created_at: DateTime<Utc>,
    pub user_message_count: usize,
    pub assistant_message_count: usize,
}
