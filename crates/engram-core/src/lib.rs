//! # Engram Core
//!
//! Chat memory engine. Ingests exported AI chat transcripts, enriches each
//! conversation with a summary, topic tags, and a dense embedding, and
//! serves the corpus through semantic search and a 3-D projection feed.
//!
//! - **Ingestion pipeline**: bounded-concurrency orchestrator with
//!   per-conversation failure isolation
//! - **Vector index**: in-process cosine store with durable JSON snapshots
//! - **Projection engine**: nonlinear 3-D projector + seeded k-means with
//!   human-readable cluster labels
//! - **Retrieval service**: filtered semantic search with snippets
//! - **Provider adapters**: retrying clients for summarisation, embedding,
//!   prompt synthesis, and relevance gating (cloud or local routing)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use engram_core::{Settings, MetadataStore, VectorIndex, VectorIndexConfig};
//!
//! let settings = Settings::from_env();
//! let store = MetadataStore::open(&settings.database_path())?;
//! let index = VectorIndex::open(VectorIndexConfig::new(settings.vector_store_path.clone()));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod normalize;
pub mod parse;
pub mod project;
pub mod providers;
pub mod retrieval;
pub mod store;
pub mod text;
pub mod types;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use cache::ContentCache;
pub use config::{GateSettings, ProjectionSettings, ProviderKind, ProviderSettings, Settings};
pub use error::{Error, Result};
pub use index::{IndexEntry, SearchHit, VectorIndex, VectorIndexConfig, VectorIndexStats};
pub use ingest::{BundleReport, IngestPipeline, ItemOutcome, INGEST_CONCURRENCY};
pub use normalize::normalize_conversation;
pub use project::{
    ClusterStat, FittedClusterer, FittedProjector, ProjectionEngine, ProjectorParams,
    ReprojectOutcome,
};
pub use providers::{
    build_chat_backend, build_embedding_backend, ChatBackend, ChatRequest, ConversationContext,
    EmbeddingBackend, EmbeddingClient, GateVerdict, PromptSynthesizer, RelevanceGate, Summarizer,
    SummaryOutput,
};
pub use retrieval::{RetrievalService, SearchOutcome, SearchParams, SearchResultItem};
pub use store::{MetadataStore, NewConversation, VisualizationRow};
pub use types::{
    Conversation, EmbeddingRecord, Message, MessageRole, NormalizedConversation,
    NormalizedMessage, ParsedConversation, ParsedMessage, EMBEDDING_DIMENSIONS, UNCLUSTERED,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
