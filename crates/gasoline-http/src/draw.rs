//! Draw-mode completion ingestion (§4.6/§4.7): the extension posts the
//! annotations a user drew over a page; we persist them via the session
//! store and hand back how many annotations now live in that file.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use gasoline_store::Session;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::HttpState;

#[derive(Debug, Serialize)]
struct DrawModeComplete {
    status: &'static str,
    annotation_count: usize,
}

pub async fn draw_mode_complete(
    State(state): State<Arc<HttpState>>,
    Json(session): Json<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let (annotation_count, _path) = state
        .ctx
        .sessions
        .store(session)
        .map_err(|e| ApiError::internal(format!("failed to store session: {e}")))?;

    Ok(Json(DrawModeComplete {
        status: "stored",
        annotation_count,
    }))
}
