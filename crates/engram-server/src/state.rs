//! Application State
//!
//! Process-wide singletons with an explicit init phase: the metadata
//! store, vector index, provider clients, projection engine, ingest
//! pipeline, and retrieval service, all constructed from one `Settings`
//! value at startup.

use std::sync::Arc;

use engram_core::{
    build_chat_backend, build_embedding_backend, ChatBackend, ContentCache, EmbeddingBackend,
    EmbeddingClient, IngestPipeline, MetadataStore, ProjectionEngine, PromptSynthesizer,
    RelevanceGate, Result, RetrievalService, Settings, Summarizer, VectorIndex, VectorIndexConfig,
};
use tracing::info;

/// Shared application state. Cheap to clone; everything inside is Arc'd.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<MetadataStore>,
    pub index: Arc<VectorIndex>,
    pub embedder: Arc<EmbeddingClient>,
    pub summarizer: Arc<Summarizer>,
    pub prompt: Arc<PromptSynthesizer>,
    /// Present only when the relevance gate is enabled.
    pub gate: Option<Arc<RelevanceGate>>,
    pub engine: Arc<ProjectionEngine>,
    pub pipeline: Arc<IngestPipeline>,
    pub retrieval: Arc<RetrievalService>,
}

impl AppState {
    /// Build the full state from settings, routing providers per config.
    pub fn initialize(settings: Settings) -> Result<Self> {
        let embedding_backend = build_embedding_backend(&settings.providers);
        let chat_backend = build_chat_backend(&settings.providers);
        Self::with_backends(settings, embedding_backend, chat_backend)
    }

    /// Build the state with explicit backends. Tests inject deterministic
    /// providers through this constructor.
    pub fn with_backends(
        settings: Settings,
        embedding_backend: Arc<dyn EmbeddingBackend>,
        chat_backend: Arc<dyn ChatBackend>,
    ) -> Result<Self> {
        let store = Arc::new(MetadataStore::open(&settings.database_path())?);
        let index = Arc::new(VectorIndex::open(VectorIndexConfig::new(
            settings.vector_store_path.clone(),
        )));
        info!(
            "Vector index loaded with {} entries from {}",
            index.count(),
            settings.vector_store_path.display()
        );

        let cache = ContentCache::new(&settings.cache_dir);
        let embedder = Arc::new(EmbeddingClient::new(embedding_backend, cache.clone()));
        let summarizer = Arc::new(Summarizer::new(chat_backend.clone(), cache));
        let prompt = Arc::new(PromptSynthesizer::new(chat_backend.clone()));
        let gate = settings
            .gate
            .enabled
            .then(|| Arc::new(RelevanceGate::new(chat_backend, settings.gate.threshold)));

        let engine = Arc::new(ProjectionEngine::new(
            store.clone(),
            index.clone(),
            settings.projection,
            settings.model_dir.clone(),
        ));
        let pipeline = Arc::new(IngestPipeline::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            summarizer.clone(),
            engine.clone(),
        ));
        let retrieval = Arc::new(RetrievalService::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
        ));

        Ok(Self {
            settings: Arc::new(settings),
            store,
            index,
            embedder,
            summarizer,
            prompt,
            gate,
            engine,
            pipeline,
            retrieval,
        })
    }
}
