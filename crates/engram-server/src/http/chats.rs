//! Conversation endpoints: listing, detail, deletion, and the
//! visualisation feed.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json};
use engram_core::Error;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/chats — conversation metadata, newest first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);

    let conversations = state.store.list_conversations(limit, offset)?;

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=60")],
        Json(serde_json::to_value(conversations).unwrap_or(Value::Null)),
    ))
}

/// GET /api/chats/{id} — full conversation with messages in order.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let conversation = state
        .store
        .get_conversation(&conversation_id)?
        .ok_or_else(|| ApiError(Error::NotFound(format!("Conversation {conversation_id}"))))?;
    let messages = state.store.get_messages(&conversation_id)?;

    let mut body = serde_json::to_value(&conversation).unwrap_or(Value::Null);
    body["messages"] = serde_json::to_value(&messages).unwrap_or(Value::Null);

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(body),
    ))
}

/// DELETE /api/chats/{id} — cascade delete, including the index entry.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let deleted = state.store.delete_conversation(&conversation_id)?;
    if !deleted {
        return Err(ApiError(Error::NotFound(format!(
            "Conversation {conversation_id}"
        ))));
    }

    if let Err(e) = state.index.delete(&conversation_id) {
        warn!("Index delete for {} failed: {}", conversation_id, e);
    }

    info!("Deleted conversation {}", conversation_id);
    Ok(Json(json!({
        "success": true,
        "message": format!("Conversation {conversation_id} deleted successfully"),
    })))
}

/// GET /api/chats/visualization — every projected conversation as a 3-D
/// node plus per-cluster counts.
pub async fn visualization(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let rows = state.store.visualization_rows()?;

    let mut clusters: Vec<(i64, String, usize)> = Vec::new();
    let nodes: Vec<Value> = rows
        .iter()
        .map(|row| {
            let conv = &row.conversation;
            let label = conv
                .cluster_label
                .clone()
                .unwrap_or_else(|| "Unclustered".to_string());

            match clusters.iter_mut().find(|(id, _, _)| *id == conv.cluster_id) {
                Some((_, _, count)) => *count += 1,
                None => clusters.push((conv.cluster_id, label.clone(), 1)),
            }

            json!({
                "id": conv.id,
                "title": conv.title,
                "summary": conv.summary,
                "topics": conv.topics,
                "cluster_id": conv.cluster_id,
                "cluster_label": label,
                "message_count": conv.message_count,
                "position": row.position,
                "start_position": row.start_position,
                "magnitude": row.magnitude,
                "created_at": conv.created_at.to_rfc3339(),
            })
        })
        .collect();

    clusters.sort_by_key(|(id, _, _)| *id);
    let cluster_list: Vec<Value> = clusters
        .into_iter()
        .map(|(id, label, count)| {
            json!({ "cluster_id": id, "cluster_label": label, "count": count })
        })
        .collect();

    Ok(Json(json!({
        "nodes": nodes,
        "total_nodes": rows.len(),
        "clusters": cluster_list,
    })))
}
