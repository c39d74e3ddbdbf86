//! The three-stage upload flow (§4.6): a tool call can't reach into the
//! filesystem itself, so it reads a local file here (stage 1), the
//! extension attaches it to a page's file input via the command queue
//! (stage 2, see `gasoline-tools::interact`), and this module assembles
//! the final form submission (stage 3).

use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::HttpState;

#[derive(Debug, Deserialize)]
pub struct FileReadBody {
    file_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileReadResponse {
    success: bool,
    file_name: String,
    file_size: u64,
    mime_type: String,
    data_base64: String,
}

pub async fn file_read(Json(body): Json<FileReadBody>) -> Result<impl IntoResponse, ApiError> {
    let file_path = body.file_path.ok_or_else(|| ApiError::bad_request("missing file_path"))?;
    let path = Path::new(&file_path);

    if !path.is_absolute() || file_path.contains("..") {
        return Err(ApiError::forbidden("path_not_allowed"));
    }

    let metadata = std::fs::metadata(path).map_err(|_| ApiError::not_found("file not found"))?;
    if metadata.is_dir() {
        return Err(ApiError::forbidden("path_not_allowed"));
    }

    let bytes = std::fs::read(path).map_err(|e| ApiError::internal(format!("failed to read file: {e}")))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(Json(FileReadResponse {
        success: true,
        file_name: file_name.clone(),
        file_size: metadata.len(),
        mime_type: guess_mime_type(&file_name),
        data_base64: BASE64.encode(&bytes),
    }))
}

fn guess_mime_type(file_name: &str) -> String {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[derive(Debug, Deserialize)]
pub struct FormSubmitBody {
    tab_id: String,
    selector: String,
    file_name: String,
    mime_type: String,
    data_base64: String,
    #[serde(default)]
    submit: bool,
}

pub async fn form_submit(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<FormSubmitBody>,
) -> Result<impl IntoResponse, ApiError> {
    let command = gasoline_pending::CommandRequest {
        action: "assemble_form_upload".to_string(),
        params: json!({
            "tab_id": body.tab_id,
            "selector": body.selector,
            "file_name": body.file_name,
            "mime_type": body.mime_type,
            "data_base64": body.data_base64,
            "submit": body.submit,
        }),
        pilot_required: true,
    };

    let (correlation_id, rx) = state
        .ctx
        .commands
        .enqueue(command)
        .map_err(|_| ApiError::forbidden("pilot_disabled"))?;

    match gasoline_pending::wait(rx, state.ctx.pending_ttl).await {
        gasoline_pending::WaitResult::Completed(result) => Ok(Json(json!({
            "status": "submitted",
            "correlation_id": correlation_id,
            "result": result,
        }))),
        gasoline_pending::WaitResult::Failed(error) => Err(ApiError::internal(error)),
        gasoline_pending::WaitResult::TimedOut => Err(ApiError::new(axum::http::StatusCode::GATEWAY_TIMEOUT, "bridge_timeout")),
    }
}

pub async fn os_automation_inject(
    State(state): State<Arc<HttpState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.os_automation_enabled {
        return Err(ApiError::forbidden("os automation is disabled; pass --enable-os-upload-automation to enable it"));
    }

    let command = gasoline_pending::CommandRequest {
        action: "os_automation_inject".to_string(),
        params: payload,
        pilot_required: true,
    };

    let (correlation_id, rx) = state
        .ctx
        .commands
        .enqueue(command)
        .map_err(|_| ApiError::forbidden("pilot_disabled"))?;

    match gasoline_pending::wait(rx, state.ctx.pending_ttl).await {
        gasoline_pending::WaitResult::Completed(result) => Ok(Json(json!({
            "status": "injected",
            "correlation_id": correlation_id,
            "result": result,
        }))),
        gasoline_pending::WaitResult::Failed(error) => Err(ApiError::internal(error)),
        gasoline_pending::WaitResult::TimedOut => Err(ApiError::new(axum::http::StatusCode::GATEWAY_TIMEOUT, "bridge_timeout")),
    }
}
