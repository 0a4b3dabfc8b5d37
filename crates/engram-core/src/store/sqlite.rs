//! SQLite Metadata Store Implementation
//!
//! Separate reader/writer connections for interior mutability. All methods
//! take `&self`, making the store `Send + Sync` so callers can share an
//! `Arc<MetadataStore>` without an outer lock.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{
    Conversation, EmbeddingRecord, Message, MessageRole, NormalizedMessage, UNCLUSTERED,
};

// ============================================================================
// INPUT / OUTPUT SHAPES
// ============================================================================

/// Everything one ingest item persists, in a single transaction.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<NormalizedMessage>,
    pub vector: Vec<f32>,
}

/// One row of the visualisation feed: conversation metadata joined with its
/// projected coordinates.
#[derive(Debug, Clone)]
pub struct VisualizationRow {
    pub conversation: Conversation,
    pub position: [f32; 3],
    pub start_position: [f32; 3],
    pub magnitude: f32,
}

// ============================================================================
// STORE
// ============================================================================

/// The relational metadata store.
pub struct MetadataStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl MetadataStore {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (and migrate) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer_conn = Connection::open(path)?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    /// Liveness check for the health endpoint.
    pub fn ping(&self) -> bool {
        self.lock(&self.reader)
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Persist a conversation, its messages, and its embedding atomically.
    /// Rolls back everything if any insert fails.
    pub fn persist_conversation(&self, new: &NewConversation) -> Result<()> {
        let now = Utc::now();
        let topics_json = serde_json::to_string(&new.topics).unwrap_or_else(|_| "[]".to_string());
        let vector_json = serde_json::to_string(&new.vector)
            .map_err(|e| Error::Internal(format!("vector serialization failed: {e}")))?;

        let mut conn = self.lock(&self.writer);
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO conversations
                 (id, title, summary, topics, cluster_id, cluster_label,
                  message_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?8)",
            params![
                new.id,
                new.title,
                new.summary,
                topics_json,
                UNCLUSTERED,
                new.messages.len() as i64,
                new.created_at.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        for msg in &new.messages {
            tx.execute(
                "INSERT INTO messages
                     (id, conversation_id, role, content, sequence_number, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    new.id,
                    msg.role.as_str(),
                    msg.content,
                    msg.sequence_number,
                    new.created_at.to_rfc3339(),
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO embeddings (conversation_id, vector) VALUES (?1, ?2)",
            params![new.id, vector_json],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Cascade-delete a conversation. Returns whether it existed.
    pub fn delete_conversation(&self, conversation_id: &str) -> Result<bool> {
        let conn = self.lock(&self.writer);
        let deleted = conn.execute(
            "DELETE FROM conversations WHERE id = ?1",
            params![conversation_id],
        )?;
        Ok(deleted > 0)
    }

    /// Write one projection result back: coordinates on the embedding row,
    /// cluster assignment on the conversation row.
    pub fn update_projection(
        &self,
        conversation_id: &str,
        position: [f32; 3],
        magnitude: f32,
        cluster_id: i64,
        cluster_label: &str,
    ) -> Result<()> {
        let position_json = serde_json::to_string(&position)
            .map_err(|e| Error::Internal(format!("position serialization failed: {e}")))?;

        let mut conn = self.lock(&self.writer);
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE embeddings
                 SET position = ?2, start_position = '[0.0,0.0,0.0]', magnitude = ?3
             WHERE conversation_id = ?1",
            params![conversation_id, position_json, magnitude as f64],
        )?;

        tx.execute(
            "UPDATE conversations
                 SET cluster_id = ?2, cluster_label = ?3, updated_at = ?4
             WHERE id = ?1",
            params![
                conversation_id,
                cluster_id,
                cluster_label,
                Utc::now().to_rfc3339()
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn count_conversations(&self) -> Result<i64> {
        let conn = self.lock(&self.reader);
        Ok(conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?)
    }

    /// Conversations newest-first with pagination.
    pub fn list_conversations(&self, limit: i64, offset: i64) -> Result<Vec<Conversation>> {
        let conn = self.lock(&self.reader);
        let mut stmt = conn.prepare(
            "SELECT id, title, summary, topics, cluster_id, cluster_label,
                    message_count, created_at, updated_at
             FROM conversations
             ORDER BY created_at DESC
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt.query_map(params![limit, offset], row_to_conversation)?;
        collect_rows(rows)
    }

    pub fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let conn = self.lock(&self.reader);
        let conversation = conn
            .query_row(
                "SELECT id, title, summary, topics, cluster_id, cluster_label,
                        message_count, created_at, updated_at
                 FROM conversations WHERE id = ?1",
                params![conversation_id],
                row_to_conversation,
            )
            .optional()?;
        Ok(conversation)
    }

    /// Batched lookup for retrieval hydration. Ids missing from the store
    /// are silently absent from the result.
    pub fn get_conversations_by_ids(&self, ids: &[String]) -> Result<Vec<Conversation>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, title, summary, topics, cluster_id, cluster_label,
                    message_count, created_at, updated_at
             FROM conversations WHERE id IN ({placeholders})"
        );

        let conn = self.lock(&self.reader);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids), row_to_conversation)?;
        collect_rows(rows)
    }

    /// Messages of a conversation in sequence order.
    pub fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let conn = self.lock(&self.reader);
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, sequence_number, created_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY sequence_number",
        )?;

        let rows = stmt.query_map(params![conversation_id], |row| {
            let role_str: String = row.get(2)?;
            Ok(Message {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                role: MessageRole::parse(&role_str).unwrap_or(MessageRole::User),
                content: row.get(3)?,
                sequence_number: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;
        collect_rows(rows)
    }

    pub fn get_embedding(&self, conversation_id: &str) -> Result<Option<EmbeddingRecord>> {
        let conn = self.lock(&self.reader);
        let record = conn
            .query_row(
                "SELECT conversation_id, vector, position, start_position, magnitude
                 FROM embeddings WHERE conversation_id = ?1",
                params![conversation_id],
                row_to_embedding,
            )
            .optional()?;
        Ok(record)
    }

    pub fn get_embeddings_by_ids(&self, ids: &[String]) -> Result<Vec<EmbeddingRecord>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT conversation_id, vector, position, start_position, magnitude
             FROM embeddings WHERE conversation_id IN ({placeholders})"
        );

        let conn = self.lock(&self.reader);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids), row_to_embedding)?;
        collect_rows(rows)
    }

    /// Every stored embedding, for projection fits.
    pub fn all_embeddings(&self) -> Result<Vec<EmbeddingRecord>> {
        let conn = self.lock(&self.reader);
        let mut stmt = conn.prepare(
            "SELECT conversation_id, vector, position, start_position, magnitude
             FROM embeddings ORDER BY conversation_id",
        )?;
        let rows = stmt.query_map([], row_to_embedding)?;
        collect_rows(rows)
    }

    /// Conversation metadata joined with projected coordinates, for the
    /// visualisation feed.
    pub fn visualization_rows(&self) -> Result<Vec<VisualizationRow>> {
        let conn = self.lock(&self.reader);
        let mut stmt = conn.prepare(
            "SELECT c.id, c.title, c.summary, c.topics, c.cluster_id, c.cluster_label,
                    c.message_count, c.created_at, c.updated_at,
                    e.position, e.start_position, e.magnitude
             FROM conversations c
             JOIN embeddings e ON e.conversation_id = c.id
             ORDER BY c.created_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            let conversation = row_to_conversation(row)?;
            let position: String = row.get(9)?;
            let start_position: String = row.get(10)?;
            let magnitude: f64 = row.get(11)?;
            Ok(VisualizationRow {
                conversation,
                position: parse_point(&position),
                start_position: parse_point(&start_position),
                magnitude: magnitude as f32,
            })
        })?;
        collect_rows(rows)
    }

    fn lock<'a>(&self, conn: &'a Mutex<Connection>) -> MutexGuard<'a, Connection> {
        conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let topics_json: String = row.get(3)?;
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        summary: row.get(2)?,
        topics: serde_json::from_str(&topics_json).unwrap_or_default(),
        cluster_id: row.get(4)?,
        cluster_label: row.get(5)?,
        message_count: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn row_to_embedding(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmbeddingRecord> {
    let vector_json: String = row.get(1)?;
    let position_json: String = row.get(2)?;
    let start_json: String = row.get(3)?;
    let magnitude: f64 = row.get(4)?;
    Ok(EmbeddingRecord {
        conversation_id: row.get(0)?,
        vector: serde_json::from_str(&vector_json).unwrap_or_default(),
        position: parse_point(&position_json),
        start_position: parse_point(&start_json),
        magnitude: magnitude as f32,
    })
}

fn parse_datetime(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_point(raw: &str) -> [f32; 3] {
    serde_json::from_str(raw).unwrap_or([0.0; 3])
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================
