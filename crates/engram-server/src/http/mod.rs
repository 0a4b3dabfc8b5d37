//! REST API
//!
//! Route table, CORS, and the HTTP error boundary. Handlers live in
//! per-resource modules and shape responses with `serde_json::json!`.

pub mod chats;
pub mod error;
pub mod health;
pub mod ingest;
pub mod prompt;
pub mod search;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::protocol;
use crate::state::AppState;

/// Build the full application router: REST API plus the tool endpoint.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/api/ingest", post(ingest::ingest_single))
        .route("/api/ingest/batch", post(ingest::ingest_batch))
        .route("/api/ingest/reproject", post(ingest::reproject))
        .route("/api/chats", get(chats::list_conversations))
        .route("/api/chats/visualization", get(chats::visualization))
        .route(
            "/api/chats/{id}",
            get(chats::get_conversation).delete(chats::delete_conversation),
        )
        .route("/api/search", post(search::search))
        .route("/api/search/stats", get(search::stats))
        .route("/api/prompt/generate", post(prompt::generate))
        .route("/mcp", post(protocol::http::handle_mcp_post))
        .route(
            "/sse",
            get(protocol::http::handle_sse_get).post(protocol::http::handle_sse_post),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| warn!("Ignoring invalid CORS origin '{}': {}", origin, e))
                .ok()
        })
        .collect();
    layer.allow_origin(parsed)
}
