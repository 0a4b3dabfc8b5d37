//! Vector Index
//!
//! In-process cosine-similarity store mapping conversation ids to
//! {document, embedding, metadata}. Every mutation snapshots the full store
//! to a single JSON file, so the on-disk state is always a superset of what
//! any reader has observed.
//!
//! Thread model: one mutex serialises mutations and reads. Scans are
//! O(M * D), which is the right trade at conversation-corpus scale.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::EMBEDDING_DIMENSIONS;

// ============================================================================
// TYPES
// ============================================================================

/// One stored entry: the searchable document, its embedding, and a small
/// metadata map carried through to search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub document: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Value,
}

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub conversation_id: String,
    pub score: f32,
    pub document: String,
    pub metadata: Value,
}

/// Configuration for the vector index.
#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    /// Snapshot file path
    pub store_path: PathBuf,
    /// Corpus-wide embedding dimension
    pub dimensions: usize,
}

impl VectorIndexConfig {
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store_path,
            dimensions: EMBEDDING_DIMENSIONS,
        }
    }
}

/// Index statistics.
#[derive(Debug, Clone, Serialize)]
pub struct VectorIndexStats {
    pub collection_name: String,
    pub document_count: usize,
    pub dimensions: usize,
    pub store_path: String,
}

// ============================================================================
// VECTOR INDEX
// ============================================================================

/// The in-process similarity store.
pub struct VectorIndex {
    config: VectorIndexConfig,
    data: Mutex<HashMap<String, IndexEntry>>,
}

impl VectorIndex {
    /// Open the index, loading the snapshot when one exists. A corrupt or
    /// absent snapshot yields an empty store rather than an error.
    pub fn open(config: VectorIndexConfig) -> Self {
        let data = match fs::read_to_string(&config.store_path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, IndexEntry>>(&raw) {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        "Vector store snapshot at {} is corrupt ({}), starting empty",
                        config.store_path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            config,
            data: Mutex::new(data),
        }
    }

    /// Insert or replace an entry, then snapshot.
    pub fn upsert(
        &self,
        conversation_id: &str,
        document: String,
        embedding: Vec<f32>,
        metadata: Value,
    ) -> Result<()> {
        if embedding.len() != self.config.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimensions,
                got: embedding.len(),
            });
        }

        let mut data = self.lock();
        data.insert(
            conversation_id.to_string(),
            IndexEntry {
                document,
                embedding,
                metadata,
            },
        );
        self.snapshot(&data)
    }

    /// Remove an entry. Returns whether it existed; snapshots only when it did.
    pub fn delete(&self, conversation_id: &str) -> Result<bool> {
        let mut data = self.lock();
        let removed = data.remove(conversation_id).is_some();
        if removed {
            self.snapshot(&data)?;
        }
        Ok(removed)
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.lock().contains_key(conversation_id)
    }

    /// Cosine-similarity search.
    ///
    /// Results come back in strictly decreasing score order with ties broken
    /// by id; `min_score` filters scores strictly below the threshold, and
    /// `k` caps the post-filter list. An empty store returns an empty list.
    pub fn search(&self, query: &[f32], k: usize, min_score: f32) -> Result<Vec<SearchHit>> {
        if query.len() != self.config.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimensions,
                got: query.len(),
            });
        }

        let data = self.lock();
        if data.is_empty() {
            return Ok(vec![]);
        }

        let mut scored: Vec<SearchHit> = data
            .iter()
            .map(|(id, entry)| SearchHit {
                conversation_id: id.clone(),
                score: cosine_similarity(query, &entry.embedding),
                document: entry.document.clone(),
                metadata: entry.metadata.clone(),
            })
            .collect();
        drop(data);

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.conversation_id.cmp(&b.conversation_id))
        });

        Ok(scored
            .into_iter()
            .filter(|hit| hit.score >= min_score)
            .take(k.max(1))
            .collect())
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn stats(&self) -> VectorIndexStats {
        let collection_name = self
            .config
            .store_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vector_store".to_string());

        VectorIndexStats {
            collection_name,
            document_count: self.count(),
            dimensions: self.config.dimensions,
            store_path: self.config.store_path.display().to_string(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, IndexEntry>> {
        // A poisoned lock means a panic mid-mutation; the map itself is
        // still structurally valid, so recover the guard.
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write the full store to disk, creating the containing directory on
    /// demand. The write goes through a temp file and rename so readers of
    /// the snapshot never see a torn file.
    fn snapshot(&self, data: &HashMap<String, IndexEntry>) -> Result<()> {
        if let Some(parent) = self.config.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let payload = serde_json::to_string(data)
            .map_err(|e| Error::Internal(format!("snapshot serialization failed: {e}")))?;

        let tmp_path = self.config.store_path.with_extension("json.tmp");
        fs::write(&tmp_path, payload)?;
        fs::rename(&tmp_path, &self.config.store_path)?;
        Ok(())
    }
}

/// Cosine similarity with zero-norm vectors treated as similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

// ============================================================================
// TESTS
// ============================================================================
