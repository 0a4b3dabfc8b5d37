//! Ingest endpoints: single upload, batch upload, and reprojection.

use axum::extract::{Multipart, State};
use axum::response::Json;
use engram_core::Error;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::warn;

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

/// One uploaded file.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Parsed multipart body: files plus the `auto_reproject` flag.
struct UploadForm {
    files: Vec<Upload>,
    auto_reproject: bool,
}

async fn read_form(mut multipart: Multipart, default_reproject: bool) -> ApiResult<UploadForm> {
    let mut form = UploadForm {
        files: vec![],
        auto_reproject: default_reproject,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(Error::InvalidInput(format!("malformed multipart body: {e}"))))?
    {
        match field.name().unwrap_or("") {
            "file" | "files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError(Error::InvalidInput(format!("unreadable upload: {e}"))))?;
                form.files.push(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "auto_reproject" => {
                let text = field.text().await.unwrap_or_default();
                form.auto_reproject = matches!(text.trim(), "1" | "true" | "yes" | "on");
            }
            other => {
                warn!("Ignoring unknown multipart field '{}'", other);
            }
        }
    }

    Ok(form)
}

/// POST /api/ingest — one HTML bundle (which may hold many conversations).
pub async fn ingest_single(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let form = read_form(multipart, false).await?;
    let upload = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError(Error::InvalidInput("missing 'file' field".to_string())))?;

    let report = state
        .pipeline
        .ingest_bundle(&upload.file_name, &upload.bytes, form.auto_reproject)
        .await?;

    Ok(Json(serde_json::to_value(report).map_err(|e| {
        ApiError(Error::Internal(format!("report serialization failed: {e}")))
    })?))
}

/// POST /api/ingest/batch — multiple files; per-file failures are reported,
/// never fatal to the batch.
pub async fn ingest_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let started = Instant::now();
    let form = read_form(multipart, true).await?;
    if form.files.is_empty() {
        return Err(ApiError(Error::InvalidInput(
            "no files in upload".to_string(),
        )));
    }

    let total = form.files.len();
    let mut successful = 0usize;
    let mut failed = 0usize;
    let mut reports: Vec<Value> = Vec::with_capacity(total);

    // Re-projection runs once at the end rather than per file
    for upload in &form.files {
        match state
            .pipeline
            .ingest_bundle(&upload.file_name, &upload.bytes, false)
            .await
        {
            Ok(report) => {
                if report.success {
                    successful += 1;
                } else {
                    failed += 1;
                }
                reports.push(serde_json::to_value(&report).unwrap_or(Value::Null));
            }
            Err(e) => {
                failed += 1;
                reports.push(json!({
                    "success": false,
                    "conversation_id": null,
                    "title": upload.file_name,
                    "message_count": 0,
                    "error": e.to_string(),
                    "processing_time_ms": 0.0,
                }));
            }
        }
    }

    if form.auto_reproject && successful > 0 {
        if let Err(e) = state.engine.reproject_all() {
            warn!("Post-batch reprojection failed: {}", e);
        }
    }

    Ok(Json(json!({
        "total_processed": total,
        "successful": successful,
        "failed": failed,
        "conversations": reports,
        "total_time_ms": started.elapsed().as_secs_f64() * 1000.0,
    })))
}

/// POST /api/ingest/reproject — re-fit projection and clustering over the
/// whole corpus.
pub async fn reproject(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let outcome = state.engine.reproject_all()?;
    let mut value = serde_json::to_value(&outcome)
        .map_err(|e| ApiError(Error::Internal(format!("outcome serialization failed: {e}"))))?;
    value["success"] = json!(true);
    Ok(Json(value))
}
