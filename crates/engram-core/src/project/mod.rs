//! Projection + Clustering Engine
//!
//! Fits a nonlinear 3-D projector and a centroid clusterer over every
//! stored embedding, writes coordinates and cluster labels back through the
//! metadata store, and reconciles vector-index entries that earlier ingest
//! runs failed to write. Model artifacts persist as JSON so a later
//! single-point transform can reuse the fit; persistence failure is
//! non-fatal.

mod kmeans;
mod labels;
mod umap;

pub use kmeans::FittedClusterer;
pub use labels::label_clusters;
pub use umap::{normalize_coordinates, FittedProjector, ProjectorParams};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ProjectionSettings;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::store::MetadataStore;
use crate::text::compose_document;
use crate::types::NormalizedMessage;

/// Deterministic seed shared by the projector and clusterer.
const MODEL_SEED: u64 = 42;

const PROJECTOR_FILE: &str = "projector.json";
const CLUSTERER_FILE: &str = "clusterer.json";

/// Per-cluster distribution entry in the reprojection report.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStat {
    pub cluster_id: i64,
    pub cluster_label: String,
    pub count: usize,
    pub percentage: f64,
}

/// Outcome of one full reprojection run.
#[derive(Debug, Clone, Serialize)]
pub struct ReprojectOutcome {
    pub conversations_processed: usize,
    pub conversations_updated: usize,
    pub n_clusters: usize,
    pub cluster_statistics: Vec<ClusterStat>,
    pub processing_time_ms: f64,
}

/// The projection engine singleton.
pub struct ProjectionEngine {
    store: Arc<MetadataStore>,
    index: Arc<VectorIndex>,
    settings: ProjectionSettings,
    model_dir: PathBuf,
}

impl ProjectionEngine {
    pub fn new(
        store: Arc<MetadataStore>,
        index: Arc<VectorIndex>,
        settings: ProjectionSettings,
        model_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            index,
            settings,
            model_dir,
        }
    }

    /// Re-fit over the whole corpus and write every conversation's 3-D
    /// point, magnitude, and cluster assignment back to the store.
    pub fn reproject_all(&self) -> Result<ReprojectOutcome> {
        let started = Instant::now();

        let embeddings = self.store.all_embeddings()?;
        if embeddings.len() < 2 {
            return Err(Error::InsufficientData(
                "at least 2 conversations required for projection".to_string(),
            ));
        }

        let ids: Vec<String> = embeddings.iter().map(|e| e.conversation_id.clone()).collect();
        let vectors: Vec<Vec<f32>> = embeddings.iter().map(|e| e.vector.clone()).collect();

        // Titles and topics in embedding order, for labelling
        let conversations = self.store.get_conversations_by_ids(&ids)?;
        let by_id: HashMap<&str, _> = conversations.iter().map(|c| (c.id.as_str(), c)).collect();
        let titles: Vec<String> = ids
            .iter()
            .map(|id| by_id.get(id.as_str()).map(|c| c.title.clone()).unwrap_or_default())
            .collect();
        let topics: Vec<Vec<String>> = ids
            .iter()
            .map(|id| by_id.get(id.as_str()).map(|c| c.topics.clone()).unwrap_or_default())
            .collect();

        info!("Fitting projector over {} embeddings", vectors.len());
        let projector = FittedProjector::fit(
            &vectors,
            ProjectorParams {
                n_neighbors: self.settings.n_neighbors,
                min_dist: self.settings.min_dist,
                seed: MODEL_SEED,
            },
        )?;
        let points = normalize_coordinates(&projector.points, self.settings.scale);

        let k = self.settings.n_clusters.min(points.len());
        info!("Clustering {} points into {} clusters", points.len(), k);
        let (clusterer, assignments) = FittedClusterer::fit(&points, k, MODEL_SEED)?;
        let cluster_labels = label_clusters(&assignments, &titles, &topics);

        let mut updated = 0usize;
        for (idx, id) in ids.iter().enumerate() {
            let position = points[idx];
            let magnitude =
                (position[0].powi(2) + position[1].powi(2) + position[2].powi(2)).sqrt();
            let cluster = assignments[idx] as i64;
            let label = cluster_labels
                .get(&assignments[idx])
                .cloned()
                .unwrap_or_else(|| format!("Cluster {}", cluster));

            self.store
                .update_projection(id, position, magnitude, cluster, &label)?;
            updated += 1;
        }

        self.reconcile_index(&ids, &vectors);
        self.persist_models(&projector, &clusterer);

        let outcome = ReprojectOutcome {
            conversations_processed: ids.len(),
            conversations_updated: updated,
            n_clusters: clusterer.k(),
            cluster_statistics: cluster_stats(&assignments, &cluster_labels),
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        info!(
            processed = outcome.conversations_processed,
            clusters = outcome.n_clusters,
            duration_ms = outcome.processing_time_ms,
            "Reprojection complete"
        );
        Ok(outcome)
    }

    /// Re-upsert conversations whose index entry went missing (an earlier
    /// ingest logged and continued past an index failure).
    fn reconcile_index(&self, ids: &[String], vectors: &[Vec<f32>]) {
        for (id, vector) in ids.iter().zip(vectors.iter()) {
            if self.index.contains(id) {
                continue;
            }

            let rebuilt = self.rebuild_entry(id, vector.clone());
            if let Err(e) = rebuilt {
                warn!("Index reconciliation for {} failed: {}", id, e);
            } else {
                info!("Reconciled missing index entry for {}", id);
            }
        }
    }

    fn rebuild_entry(&self, conversation_id: &str, vector: Vec<f32>) -> Result<()> {
        let conversation = self
            .store
            .get_conversation(conversation_id)?
            .ok_or_else(|| Error::NotFound(format!("Conversation {conversation_id}")))?;
        let messages: Vec<NormalizedMessage> = self
            .store
            .get_messages(conversation_id)?
            .into_iter()
            .map(|m| NormalizedMessage {
                role: m.role,
                content: m.content,
                sequence_number: m.sequence_number,
            })
            .collect();

        let document = compose_document(
            &conversation.title,
            conversation.summary.as_deref().unwrap_or(""),
            &conversation.topics,
            &messages,
        );
        let metadata = serde_json::json!({
            "title": conversation.title,
            "topic_count": conversation.topics.len(),
            "message_count": conversation.message_count,
        });

        self.index.upsert(conversation_id, document, vector, metadata)
    }

    /// Best-effort model persistence.
    fn persist_models(&self, projector: &FittedProjector, clusterer: &FittedClusterer) {
        if let Err(e) = std::fs::create_dir_all(&self.model_dir) {
            warn!("Model dir creation failed (models not saved): {}", e);
            return;
        }

        let write = |file: &str, payload: std::result::Result<String, serde_json::Error>| {
            match payload {
                Ok(json) => {
                    if let Err(e) = std::fs::write(self.model_dir.join(file), json) {
                        warn!("Model save failed for {}: {}", file, e);
                    }
                }
                Err(e) => warn!("Model serialization failed for {}: {}", file, e),
            }
        };

        write(PROJECTOR_FILE, serde_json::to_string(projector));
        write(CLUSTERER_FILE, serde_json::to_string(clusterer));
    }

    /// Load the last fitted projector, if any. Load failure means "no
    /// model yet", never an error.
    pub fn load_projector(&self) -> Option<FittedProjector> {
        let raw = std::fs::read_to_string(self.model_dir.join(PROJECTOR_FILE)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Load the last fitted clusterer, if any.
    pub fn load_clusterer(&self) -> Option<FittedClusterer> {
        let raw = std::fs::read_to_string(self.model_dir.join(CLUSTERER_FILE)).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

fn cluster_stats(
    assignments: &[usize],
    labels: &HashMap<usize, String>,
) -> Vec<ClusterStat> {
    let total = assignments.len().max(1);
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &cluster in assignments {
        *counts.entry(cluster).or_insert(0) += 1;
    }

    let mut stats: Vec<ClusterStat> = counts
        .into_iter()
        .map(|(cluster, count)| ClusterStat {
            cluster_id: cluster as i64,
            cluster_label: labels
                .get(&cluster)
                .cloned()
                .unwrap_or_else(|| format!("Cluster {}", cluster)),
            count,
            percentage: (count as f64 / total as f64 * 1000.0).round() / 10.0,
        })
        .collect();
    stats.sort_by_key(|s| s.cluster_id);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VectorIndexConfig;
    use crate::store::NewConversation;
    use crate::types::{MessageRole, EMBEDDING_DIMENSIONS};
    use chrono::Utc;
    use tempfile::TempDir;

    fn vector(axis: usize) -> Vec<f32> {
        let mut v = vec![0.05f32; EMBEDDING_DIMENSIONS];
        v[axis] = 1.0;
        v
    }

    fn seeded_engine(dir: &TempDir, n: usize) -> (Arc<MetadataStore>, Arc<VectorIndex>, ProjectionEngine) {
        let store = Arc::new(MetadataStore::open(&dir.path().join("engram.db")).unwrap());
        let index = Arc::new(VectorIndex::open(VectorIndexConfig::new(
            dir.path().join("store.json"),
        )));

        for i in 0..n {
            let id = format!("conv-{i}");
            store
                .persist_conversation(&NewConversation {
                    id: id.clone(),
                    title: format!("Conversation number {i}"),
                    summary: "A summary.".to_string(),
                    topics: vec!["testing".to_string()],
                    created_at: Utc::now(),
                    messages: vec![NormalizedMessage {
                        role: MessageRole::User,
                        content: format!("message {i}"),
                        sequence_number: 0,
                    }],
                    vector: vector(i % 32),
                })
                .unwrap();
        }

        let engine = ProjectionEngine::new(
            store.clone(),
            index.clone(),
            ProjectionSettings::default(),
            dir.path().join("models"),
        );
        (store, index, engine)
    }

    #[test]
    fn test_reproject_requires_two() {
        let dir = TempDir::new().unwrap();
        let (_, _, engine) = seeded_engine(&dir, 1);
        let err = engine.reproject_all().unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_reproject_assigns_clusters_and_coordinates() {
        let dir = TempDir::new().unwrap();
        let (store, _, engine) = seeded_engine(&dir, 6);

        let outcome = engine.reproject_all().unwrap();
        assert_eq!(outcome.conversations_processed, 6);
        assert_eq!(outcome.conversations_updated, 6);
        assert_eq!(outcome.n_clusters, 5);

        for i in 0..6 {
            let conversation = store.get_conversation(&format!("conv-{i}")).unwrap().unwrap();
            assert!(conversation.cluster_id >= 0 && conversation.cluster_id < 5);
            assert!(conversation.cluster_label.is_some());

            let embedding = store.get_embedding(&format!("conv-{i}")).unwrap().unwrap();
            assert!(embedding.position.iter().all(|v| v.is_finite()));
            assert!(embedding.position.iter().all(|v| v.abs() <= 10.0 + 1e-3));
            let expected_magnitude = embedding
                .position
                .iter()
                .map(|v| v * v)
                .sum::<f32>()
                .sqrt();
            assert!((embedding.magnitude - expected_magnitude).abs() < 1e-4);
        }

        let total: usize = outcome.cluster_statistics.iter().map(|s| s.count).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_reproject_reconciles_missing_index_entries() {
        let dir = TempDir::new().unwrap();
        let (_, index, engine) = seeded_engine(&dir, 3);

        // Nothing was ever indexed; reprojection backfills all three
        assert_eq!(index.count(), 0);
        engine.reproject_all().unwrap();
        assert_eq!(index.count(), 3);
        assert!(index.contains("conv-0"));
    }

    #[test]
    fn test_models_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let (_, _, engine) = seeded_engine(&dir, 4);

        assert!(engine.load_projector().is_none());
        engine.reproject_all().unwrap();

        let projector = engine.load_projector().unwrap();
        assert_eq!(projector.training_data.len(), 4);
        let clusterer = engine.load_clusterer().unwrap();
        assert_eq!(clusterer.k(), 4);
    }
}
