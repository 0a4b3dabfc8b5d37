//! Search endpoints: semantic search and index statistics.

use axum::extract::State;
use axum::response::Json;
use engram_core::retrieval::{SearchParams, DEFAULT_LIMIT, DEFAULT_MIN_SCORE};
use engram_core::Error;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    pub min_score: Option<f32>,
    pub cluster_filter: Option<i64>,
    #[serde(default)]
    pub topic_filter: Vec<String>,
}

/// POST /api/search — query embedding → vector search → hydrated results.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<Value>> {
    let outcome = state
        .retrieval
        .search(SearchParams {
            query: request.query,
            limit: request.limit.unwrap_or(DEFAULT_LIMIT),
            min_score: request.min_score.unwrap_or(DEFAULT_MIN_SCORE),
            cluster_filter: request.cluster_filter,
            topic_filter: request.topic_filter,
        })
        .await?;

    Ok(Json(serde_json::to_value(outcome).map_err(|e| {
        ApiError(Error::Internal(format!("outcome serialization failed: {e}")))
    })?))
}

/// GET /api/search/stats — index statistics plus the corpus size.
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let index_stats = state.index.stats();
    let conversation_count = state.store.count_conversations()?;

    Ok(Json(json!({
        "collection_name": index_stats.collection_name,
        "document_count": index_stats.document_count,
        "dimensions": index_stats.dimensions,
        "store_path": index_stats.store_path,
        "conversation_count": conversation_count,
    })))
}
