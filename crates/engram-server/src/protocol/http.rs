//! HTTP + SSE Transports for the Tool Endpoint
//!
//! - POST /mcp — JSON-RPC request → JSON response (or SSE-framed when the
//!   client asks for an event stream)
//! - GET  /sse — keep-alive event stream
//! - POST /sse — JSON-RPC response framed as a single SSE `data:` event

use std::convert::Infallible;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream;
use tracing::warn;

use super::types::{JsonRpcRequest, JsonRpcResponse, RpcError};
use crate::server::McpServer;
use crate::state::AppState;

fn parse_request(body: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    serde_json::from_str(body).map_err(|e| {
        warn!("Failed to parse JSON-RPC request: {}", e);
        JsonRpcResponse::reply(None, Err(RpcError::parse()))
    })
}

fn to_json(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        warn!("Failed to serialize response: {}", e);
        r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#
            .to_string()
    })
}

/// POST /mcp — handle one JSON-RPC request.
pub async fn handle_mcp_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = match parse_request(&body) {
        Ok(r) => r,
        Err(error_response) => {
            return (
                StatusCode::BAD_REQUEST,
                [(header::CONTENT_TYPE, "application/json")],
                to_json(&error_response),
            )
                .into_response();
        }
    };

    let server = McpServer::new(state);
    match server.handle_request(request).await {
        Some(response) => {
            let json = to_json(&response);

            let accept = headers
                .get(header::ACCEPT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/json");

            if accept.contains("text/event-stream") {
                let event = Event::default().data(&json);
                let sse_stream = stream::once(async move { Ok::<_, Infallible>(event) });
                Sse::new(sse_stream).into_response()
            } else {
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json")],
                    json,
                )
                    .into_response()
            }
        }
        // Notification — no response body
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// GET /sse — open a keep-alive stream for clients that require a standing
/// event channel.
pub async fn handle_sse_get(State(_state): State<AppState>) -> Response {
    let initial = stream::once(async { Ok::<_, Infallible>(Event::default().comment("connected")) });
    Sse::new(initial)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// POST /sse — handle one JSON-RPC request and frame the response as a
/// single SSE data event.
pub async fn handle_sse_post(State(state): State<AppState>, body: String) -> Response {
    let request = match parse_request(&body) {
        Ok(r) => r,
        Err(error_response) => {
            let json = to_json(&error_response);
            let event = Event::default().data(&json);
            let sse_stream = stream::once(async move { Ok::<_, Infallible>(event) });
            return Sse::new(sse_stream).into_response();
        }
    };

    let server = McpServer::new(state);
    let response = server
        .handle_request(request)
        .await
        .unwrap_or_else(|| JsonRpcResponse::reply(None, Ok(serde_json::json!({}))));

    let json = to_json(&response);
    let event = Event::default().data(&json);
    let sse_stream = stream::once(async move { Ok::<_, Infallible>(event) });
    Sse::new(sse_stream).into_response()
}
