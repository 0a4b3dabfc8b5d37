//! Liveness and readiness reporting.

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health — liveness plus per-dependency readiness.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database_connected = state.store.ping();
    let embedding_ready = state.embedder.probe().await;
    let chat_ready = state.summarizer.probe().await;
    let vector_store_ready = true; // in-process; loaded at startup

    let status = if database_connected && embedding_ready && chat_ready {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "version": engram_core::VERSION,
        "database_connected": database_connected,
        "vector_store_ready": vector_store_ready,
        "indexed_documents": state.index.count(),
        "embedding_provider": state.settings.providers.embedding_provider.as_str(),
        "chat_provider": state.settings.providers.chat_provider.as_str(),
        "embedding_ready": embedding_ready,
        "chat_ready": chat_ready,
    }))
}

/// GET / — service descriptor.
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Engram API",
        "version": engram_core::VERSION,
        "description": "AI Chat Memory Visualization & Retrieval System",
        "health": "/health",
    }))
}
