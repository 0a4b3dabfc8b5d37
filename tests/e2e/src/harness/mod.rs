//! Test harness: a full application over temp-dir storage.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use engram_core::{ChatBackend, EmbeddingBackend, Settings};
use engram_server::{http, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::mocks::{BagOfWordsEmbeddings, ScriptedChat};

/// Multipart boundary used by the upload helpers.
const BOUNDARY: &str = "engram-test-boundary";

/// One isolated application instance. The temp dir lives as long as the
/// environment does.
pub struct TestEnv {
    pub state: AppState,
    pub router: Router,
    _temp_dir: TempDir,
}

impl TestEnv {
    /// Default environment: bag-of-words embeddings, scripted summariser,
    /// gate disabled.
    pub fn new() -> Self {
        Self::with_backends(
            Arc::new(BagOfWordsEmbeddings::new()),
            Arc::new(ScriptedChat::summarizer()),
            false,
        )
    }

    pub fn with_backends(
        embeddings: Arc<dyn EmbeddingBackend>,
        chat: Arc<dyn ChatBackend>,
        gate_enabled: bool,
    ) -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let mut settings = Settings::default();
        settings.database_url = temp_dir.path().join("engram.db").display().to_string();
        settings.cache_dir = temp_dir.path().join("cache");
        settings.vector_store_path = temp_dir.path().join("vector_store.json");
        settings.model_dir = temp_dir.path().join("models");
        settings.gate.enabled = gate_enabled;

        let state = AppState::with_backends(settings, embeddings, chat).expect("app state");
        let router = http::build_router(state.clone());

        Self {
            state,
            router,
            _temp_dir: temp_dir,
        }
    }

    /// GET a path, returning (status, parsed JSON body).
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    /// POST a JSON body.
    pub async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }

    /// POST an empty body (reproject).
    pub async fn post_empty(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    /// DELETE a path.
    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("DELETE")
            .uri(path)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    /// Upload one HTML file to /api/ingest.
    pub async fn upload(
        &self,
        file_name: &str,
        html: &str,
        auto_reproject: bool,
    ) -> (StatusCode, Value) {
        let body = multipart_body(&[(file_name, html)], auto_reproject);
        let request = Request::builder()
            .method("POST")
            .uri("/api/ingest")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    /// Upload several HTML files to /api/ingest/batch.
    pub async fn upload_batch(
        &self,
        files: &[(&str, &str)],
        auto_reproject: bool,
    ) -> (StatusCode, Value) {
        let body = multipart_body(files, auto_reproject);
        let request = Request::builder()
            .method("POST")
            .uri("/api/ingest/batch")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    /// Send one JSON-RPC request to /mcp.
    pub async fn rpc(&self, method: &str, params: Value) -> (StatusCode, Value) {
        self.post_json(
            "/mcp",
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }),
        )
        .await
    }

    /// Raw send; parses the body as JSON when possible.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
        (status, value)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a multipart/form-data body with the given files and flag.
fn multipart_body(files: &[(&str, &str)], auto_reproject: bool) -> Vec<u8> {
    let mut body = String::new();
    let field_name = if files.len() > 1 { "files" } else { "file" };

    for (file_name, html) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"; filename=\"{file_name}\"\r\nContent-Type: text/html\r\n\r\n{html}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"auto_reproject\"\r\n\r\n{auto_reproject}\r\n"
    ));
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    body.into_bytes()
}

/// An export file with one conversation per (title, messages) entry.
pub fn export_html(conversations: &[(&str, &[(&str, &str)])]) -> String {
    let mut html = String::from("<html><body>\n");
    for (title, messages) in conversations {
        html.push_str(&format!("<div class=\"conversation\" data-title=\"{title}\">\n"));
        for (role, content) in *messages {
            html.push_str(&format!("<div data-role=\"{role}\">{content}</div>\n"));
        }
        html.push_str("</div>\n");
    }
    html.push_str("</body></html>\n");
    html
}
