//! Retrieval Service
//!
//! Semantic search over the corpus: embed the query, scan the vector
//! index with an overfetch factor, hydrate matches from the metadata
//! store, apply cluster/topic filters, and shape response items with
//! snippets and visualisation coordinates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::providers::EmbeddingClient;
use crate::store::MetadataStore;
use crate::text::snippet;

/// Index overfetch factor: filters and hydration drop-outs eat into the
/// raw result list, so ask for more than the caller wants.
const OVERFETCH: usize = 3;

/// Snippet length in characters.
const SNIPPET_CHARS: usize = 200;

/// Default similarity floor.
pub const DEFAULT_MIN_SCORE: f32 = 0.3;

/// Default result count.
pub const DEFAULT_LIMIT: usize = 10;

/// One search invocation's parameters.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub limit: usize,
    pub min_score: f32,
    pub cluster_filter: Option<i64>,
    pub topic_filter: Vec<String>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
            cluster_filter: None,
            topic_filter: vec![],
        }
    }
}

/// One search result, shaped for the API and the tool surface.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub conversation_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub topics: Vec<String>,
    pub message_count: i64,
    pub created_at: DateTime<Utc>,
    pub position: [f32; 3],
    pub start_position: [f32; 3],
    pub magnitude: f32,
    pub cluster_id: i64,
    pub cluster_label: Option<String>,
    pub score: f32,
    pub snippet: String,
}

/// Full search response.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResultItem>,
    pub search_time_ms: f64,
}

/// The retrieval singleton composing index and metadata store.
pub struct RetrievalService {
    store: Arc<MetadataStore>,
    index: Arc<VectorIndex>,
    embedder: Arc<EmbeddingClient>,
}

impl RetrievalService {
    pub fn new(
        store: Arc<MetadataStore>,
        index: Arc<VectorIndex>,
        embedder: Arc<EmbeddingClient>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
        }
    }

    pub async fn search(&self, params: SearchParams) -> Result<SearchOutcome> {
        let started = Instant::now();

        let query = params.query.trim().to_string();
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }
        let limit = params.limit.clamp(1, 100);

        // Queries are embedded fresh every time; no cache by design
        let query_vector = self.embedder.embed_query(&query).await?;

        let hits = self
            .index
            .search(&query_vector, limit * OVERFETCH, params.min_score)?;
        debug!("Index returned {} raw hits for '{}'", hits.len(), query);

        // One conversation appears at most once: max score wins, first
        // document kept for the snippet.
        let mut best: HashMap<String, (f32, String)> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for hit in hits {
            match best.get_mut(&hit.conversation_id) {
                Some((score, _)) => {
                    if hit.score > *score {
                        *score = hit.score;
                    }
                }
                None => {
                    order.push(hit.conversation_id.clone());
                    best.insert(hit.conversation_id, (hit.score, hit.document));
                }
            }
        }

        // Batched hydration; conversations deleted since indexing drop out
        let conversations = self.store.get_conversations_by_ids(&order)?;
        let embeddings = self.store.get_embeddings_by_ids(&order)?;
        let embeddings_by_id: HashMap<&str, _> = embeddings
            .iter()
            .map(|e| (e.conversation_id.as_str(), e))
            .collect();

        let topic_filter: Vec<String> = params
            .topic_filter
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut results: Vec<SearchResultItem> = Vec::new();
        for conversation in conversations {
            if let Some(cluster) = params.cluster_filter {
                if conversation.cluster_id != cluster {
                    continue;
                }
            }
            if !topic_filter.is_empty() {
                let has_match = conversation
                    .topics
                    .iter()
                    .any(|t| topic_filter.contains(&t.to_lowercase()));
                if !has_match {
                    continue;
                }
            }

            let Some((score, document)) = best.get(&conversation.id) else {
                continue;
            };
            let embedding = embeddings_by_id.get(conversation.id.as_str());

            results.push(SearchResultItem {
                conversation_id: conversation.id.clone(),
                title: conversation.title,
                summary: conversation.summary,
                topics: conversation.topics,
                message_count: conversation.message_count,
                created_at: conversation.created_at,
                position: embedding.map(|e| e.position).unwrap_or([0.0; 3]),
                start_position: embedding.map(|e| e.start_position).unwrap_or([0.0; 3]),
                magnitude: embedding.map(|e| e.magnitude).unwrap_or(0.0),
                cluster_id: conversation.cluster_id,
                cluster_label: conversation.cluster_label,
                score: *score,
                snippet: snippet(document, SNIPPET_CHARS),
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.conversation_id.cmp(&b.conversation_id))
        });
        results.truncate(limit);

        Ok(SearchOutcome {
            query,
            total_results: results.len(),
            results,
            search_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }
}
