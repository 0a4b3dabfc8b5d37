//! Content Cache
//!
//! On-disk key/value cache for generated summaries and embeddings, one
//! small JSON file per conversation id per kind. Readers treat absent or
//! unparseable files as misses; writers are best-effort and never fail the
//! producing operation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cached summariser output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSummary {
    pub summary: String,
    pub topics: Vec<String>,
}

/// Cached embedder output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEmbedding {
    pub embedding: Vec<f32>,
    pub dimension: usize,
}

/// Directory-backed content cache rooted at the configured cache dir.
#[derive(Debug, Clone)]
pub struct ContentCache {
    summaries_dir: PathBuf,
    embeddings_dir: PathBuf,
}

impl ContentCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            summaries_dir: cache_dir.join("summaries"),
            embeddings_dir: cache_dir.join("embeddings"),
        }
    }

    pub fn load_summary(&self, conversation_id: &str) -> Option<CachedSummary> {
        read_json(&self.summaries_dir.join(format!("{conversation_id}.json")))
    }

    pub fn store_summary(&self, conversation_id: &str, summary: &CachedSummary) {
        write_json(
            &self.summaries_dir,
            &format!("{conversation_id}.json"),
            summary,
        );
    }

    pub fn load_embedding(&self, conversation_id: &str) -> Option<Vec<f32>> {
        read_json::<CachedEmbedding>(&self.embeddings_dir.join(format!("{conversation_id}.json")))
            .map(|cached| cached.embedding)
    }

    pub fn store_embedding(&self, conversation_id: &str, embedding: &[f32]) {
        write_json(
            &self.embeddings_dir,
            &format!("{conversation_id}.json"),
            &CachedEmbedding {
                embedding: embedding.to_vec(),
                dimension: embedding.len(),
            },
        );
    }

    /// Delete all cached entries of both kinds, returning how many files
    /// were removed.
    pub fn clear(&self) -> usize {
        clear_dir(&self.summaries_dir) + clear_dir(&self.embeddings_dir)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Best-effort write: failures are logged, never propagated.
fn write_json<T: Serialize>(dir: &Path, file_name: &str, value: &T) {
    if let Err(e) = fs::create_dir_all(dir) {
        debug!("Cache dir creation failed for {}: {}", dir.display(), e);
        return;
    }
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(e) => {
            debug!("Cache serialization failed: {}", e);
            return;
        }
    };
    if let Err(e) = fs::write(dir.join(file_name), payload) {
        debug!("Cache write failed for {}: {}", file_name, e);
    }
}

fn clear_dir(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let mut count = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && fs::remove_file(&path).is_ok() {
            count += 1;
        }
    }
    count
}
