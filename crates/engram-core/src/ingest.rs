//! Ingestion Orchestrator
//!
//! Turns an uploaded HTML bundle into persisted conversations, embeddings,
//! and index entries. Per-conversation pipelines are crash-isolated: every
//! step returns a tagged outcome, so one bad conversation never aborts its
//! siblings. Items run in batches of bounded concurrency, batches in input
//! order.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::normalize::normalize_conversation;
use crate::parse;
use crate::project::ProjectionEngine;
use crate::providers::{fallback_summary, EmbeddingClient, Summarizer};
use crate::index::VectorIndex;
use crate::store::{MetadataStore, NewConversation};
use crate::text::{compose_document, prepare_text_for_embedding};
use crate::types::ParsedConversation;

/// Per-bundle pipeline concurrency.
pub const INGEST_CONCURRENCY: usize = 3;

/// Outcome of one conversation's pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub success: bool,
    pub conversation_id: Option<String>,
    pub title: Option<String>,
    pub message_count: i64,
    pub error: Option<String>,
    pub processing_time_ms: f64,
}

impl ItemOutcome {
    fn failure(title: Option<String>, error: String, started: Instant) -> Self {
        Self {
            success: false,
            conversation_id: None,
            title,
            message_count: 0,
            error: Some(error),
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

/// Aggregate report for one uploaded bundle.
#[derive(Debug, Clone, Serialize)]
pub struct BundleReport {
    pub success: bool,
    /// Id of the last successfully ingested conversation.
    pub conversation_id: Option<String>,
    pub title: Option<String>,
    /// Total messages across successful items.
    pub message_count: i64,
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<ItemOutcome>,
    pub processing_time_ms: f64,
}

/// The ingestion pipeline singleton.
pub struct IngestPipeline {
    store: Arc<MetadataStore>,
    index: Arc<VectorIndex>,
    embedder: Arc<EmbeddingClient>,
    summarizer: Arc<Summarizer>,
    engine: Arc<ProjectionEngine>,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<MetadataStore>,
        index: Arc<VectorIndex>,
        embedder: Arc<EmbeddingClient>,
        summarizer: Arc<Summarizer>,
        engine: Arc<ProjectionEngine>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            summarizer,
            engine,
        }
    }

    /// Ingest one HTML bundle. The bundle may contain any number of
    /// conversations; every one found is attempted.
    pub async fn ingest_bundle(
        &self,
        file_name: &str,
        bytes: &[u8],
        auto_reproject: bool,
    ) -> Result<BundleReport> {
        let started = Instant::now();

        if !file_name.to_lowercase().ends_with(".html") {
            return Err(Error::InvalidInput(
                "only HTML files are accepted".to_string(),
            ));
        }

        let html = std::str::from_utf8(bytes)
            .map_err(|_| Error::InvalidInput("file is not valid UTF-8".to_string()))?;

        if parse::detect_format(html).is_none() {
            return Err(Error::UnsupportedFormat(
                "unable to detect chat format".to_string(),
            ));
        }

        let conversations = parse::parse_all(html);
        if conversations.is_empty() {
            return Err(Error::EmptyInput(
                "no conversations found in the uploaded file".to_string(),
            ));
        }
        if conversations.iter().all(|c| c.messages.is_empty()) {
            return Err(Error::EmptyInput(
                "no conversation in the file has any messages".to_string(),
            ));
        }

        info!(
            "Found {} conversation(s) in {}",
            conversations.len(),
            file_name
        );

        // Batched fan-out: batches run in input order, items within a
        // batch concurrently.
        let mut items: Vec<ItemOutcome> = Vec::with_capacity(conversations.len());
        for batch in conversations.chunks(INGEST_CONCURRENCY) {
            let outcomes = join_all(batch.iter().map(|parsed| self.process_item(parsed))).await;
            items.extend(outcomes);
        }

        let successful = items.iter().filter(|i| i.success).count();
        let failed = items.len() - successful;
        let message_count: i64 = items.iter().filter(|i| i.success).map(|i| i.message_count).sum();
        let last_success = items.iter().rev().find(|i| i.success);
        let conversation_id = last_success.and_then(|i| i.conversation_id.clone());
        let title = if successful > 1 {
            Some(format!("{} conversations", successful))
        } else {
            last_success.and_then(|i| i.title.clone())
        };

        // Strict gating: only the explicit flag, or more than one new
        // conversation from this request, triggers reprojection.
        if (auto_reproject || successful > 1) && successful > 0 {
            info!("Reprojecting after ingest of {} conversation(s)", successful);
            if let Err(e) = self.engine.reproject_all() {
                warn!("Post-ingest reprojection failed (positions stay at origin): {}", e);
            }
        }

        Ok(BundleReport {
            success: successful > 0,
            conversation_id,
            title,
            message_count,
            total_processed: items.len(),
            successful,
            failed,
            items,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }

    /// One conversation's pipeline: normalise, summarise, embed, persist,
    /// index. Never panics across the await boundary; every failure is a
    /// tagged outcome.
    async fn process_item(&self, parsed: &ParsedConversation) -> ItemOutcome {
        let started = Instant::now();

        let normalized = match normalize_conversation(parsed) {
            Ok(n) => n,
            Err(e) => return ItemOutcome::failure(parsed.title.clone(), e.to_string(), started),
        };

        // Summariser failure is swallowed with the deterministic fallback
        let summary = match self.summarizer.summarize(None, &normalized.messages).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Summarization failed for '{}': {}", normalized.title, e);
                fallback_summary(normalized.message_count)
            }
        };

        let conversation_id = Uuid::new_v4().to_string();

        let embedding_text = prepare_text_for_embedding(
            &normalized.title,
            &summary.summary,
            &summary.topics,
            &normalized.messages,
        );

        // Embedder failure skips the conversation but not its siblings
        let vector = match self
            .embedder
            .embed_conversation(&conversation_id, &embedding_text)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("Embedding failed for '{}': {}", normalized.title, e);
                return ItemOutcome::failure(Some(normalized.title), e.to_string(), started);
            }
        };

        let new_conversation = NewConversation {
            id: conversation_id.clone(),
            title: normalized.title.clone(),
            summary: summary.summary.clone(),
            topics: summary.topics.clone(),
            created_at: normalized.created_at,
            messages: normalized.messages.clone(),
            vector: vector.clone(),
        };
        if let Err(e) = self.store.persist_conversation(&new_conversation) {
            warn!("Persistence failed for '{}': {}", normalized.title, e);
            return ItemOutcome::failure(Some(normalized.title), e.to_string(), started);
        }

        // The summary cache is keyed by id, which only exists now
        self.summarizer.remember(&conversation_id, &summary);

        // Index failure is non-fatal; reprojection reconciles later
        let document = compose_document(
            &normalized.title,
            &summary.summary,
            &summary.topics,
            &normalized.messages,
        );
        let metadata = serde_json::json!({
            "title": normalized.title,
            "topic_count": summary.topics.len(),
            "message_count": normalized.message_count,
        });
        if let Err(e) = self
            .index
            .upsert(&conversation_id, document, vector, metadata)
        {
            warn!(
                "Vector index upsert failed for {} (will reconcile at next reprojection): {}",
                conversation_id, e
            );
        }

        info!(
            "Ingested '{}' ({} messages) as {}",
            normalized.title, normalized.message_count, conversation_id
        );

        ItemOutcome {
            success: true,
            conversation_id: Some(conversation_id),
            title: Some(normalized.title),
            message_count: normalized.message_count,
            error: None,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }
}
