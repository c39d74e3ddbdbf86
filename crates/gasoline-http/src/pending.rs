//! The extension's half of the async-RPC rendezvous (§4.4/§4.6): polling
//! for work, reporting results, and refreshing the daemon's view of the
//! extension's capability state.

use std::sync::Arc;

use axum::Json;
use axum::extract::Query;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::HttpState;

#[derive(Debug, Deserialize)]
pub struct PendingQueriesQuery {
    kind: String,
    #[serde(default = "default_max")]
    max: usize,
}

fn default_max() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct PendingQueriesResponse {
    queries: Vec<gasoline_pending::PendingQueryView>,
}

pub async fn pending_queries(
    State(state): State<Arc<HttpState>>,
    Query(q): Query<PendingQueriesQuery>,
) -> impl IntoResponse {
    let queries = state.ctx.registry.claim(&q.kind, q.max);
    Json(PendingQueriesResponse { queries })
}

#[derive(Debug, Deserialize)]
pub struct QueryResultBody {
    correlation_id: String,
    status: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResultAck {
    acknowledged: bool,
}

pub async fn query_results(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<QueryResultBody>,
) -> Result<impl IntoResponse, ApiError> {
    let acknowledged = match body.status.as_str() {
        "completed" => state.ctx.registry.complete(&body.correlation_id, body.result.unwrap_or(Value::Null)),
        "failed" => state
            .ctx
            .registry
            .fail(&body.correlation_id, body.error.unwrap_or_else(|| "unknown error".to_string())),
        other => return Err(ApiError::bad_request(format!("unknown status '{other}'"))),
    };
    Ok(Json(ResultAck { acknowledged }))
}

pub async fn command_results(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<QueryResultBody>,
) -> Result<impl IntoResponse, ApiError> {
    let acknowledged = match body.status.as_str() {
        "completed" => state.ctx.commands.complete(&body.correlation_id, body.result.unwrap_or(Value::Null)),
        "failed" => state
            .ctx
            .commands
            .fail(&body.correlation_id, body.error.unwrap_or_else(|| "unknown error".to_string())),
        other => return Err(ApiError::bad_request(format!("unknown status '{other}'"))),
    };
    Ok(Json(ResultAck { acknowledged }))
}

#[derive(Debug, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pilot_enabled: bool,
    #[serde(default)]
    tracking_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct SyncBody {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    extension_version: Option<String>,
    settings: SyncSettings,
}

#[derive(Debug, Serialize)]
struct SyncAck {
    status: &'static str,
}

pub async fn sync(State(state): State<Arc<HttpState>>, Json(body): Json<SyncBody>) -> impl IntoResponse {
    tracing::info!(
        session_id = ?body.session_id,
        extension_version = ?body.extension_version,
        pilot_enabled = body.settings.pilot_enabled,
        tracking_enabled = body.settings.tracking_enabled,
        "extension sync"
    );
    state.ctx.extension_state.update(body.settings.pilot_enabled, body.settings.tracking_enabled);
    Json(SyncAck { status: "ok" })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gasoline_events::BufferSet;
    use gasoline_noise::NoiseStore;
    use gasoline_pending::CommandQueue;
    use gasoline_pending::ExtensionStateCache;
    use gasoline_pending::Registry;
    use gasoline_redact::Redactor;
    use gasoline_store::ElementDetailCache;
    use gasoline_store::KvStore;
    use gasoline_store::SessionStore;
    use gasoline_tools::AppContext;

    use super::*;

    fn test_state() -> Arc<HttpState> {
        let dir = tempfile::tempdir().unwrap().into_path();
        let registry = Arc::new(Registry::new());
        let extension_state = Arc::new(ExtensionStateCache::default());
        let pending_ttl = Duration::from_secs(5);

        let ctx = AppContext {
            buffers: Arc::new(BufferSet::default()),
            redactor: Arc::new(Redactor::default()),
            noise: Arc::new(NoiseStore::load(dir.join("noise.json"))),
            commands: Arc::new(CommandQueue::new(registry.clone(), extension_state.clone(), pending_ttl)),
            registry,
            extension_state,
            sessions: Arc::new(SessionStore::new(dir.join("sessions"))),
            element_details: Arc::new(ElementDetailCache::new(Duration::from_secs(300))),
            kv: Arc::new(KvStore::new(dir.join("kv"))),
            pending_ttl,
            version: "0.0.0-test".to_string(),
            started_at: chrono::Utc::now(),
        };
        Arc::new(HttpState::new(ctx, false))
    }

    #[tokio::test]
    async fn extension_state_is_not_pilot_enabled_until_first_sync() {
        let state = test_state();
        assert!(!state.ctx.extension_state.get().pilot_enabled);
        assert!(!state.ctx.extension_state.get().initialized);
    }

    #[tokio::test]
    async fn sync_flips_pilot_enabled_and_marks_initialized() {
        let state = test_state();
        let body = SyncBody {
            session_id: Some("s1".to_string()),
            extension_version: Some("1.2.3".to_string()),
            settings: SyncSettings { pilot_enabled: true, tracking_enabled: true },
        };
        let _ = sync(State(state.clone()), Json(body)).await;

        let snapshot = state.ctx.extension_state.get();
        assert!(snapshot.pilot_enabled);
        assert!(snapshot.tracking_enabled);
        assert!(snapshot.initialized);
    }

    #[tokio::test]
    async fn query_results_on_unknown_correlation_id_is_not_acknowledged() {
        let state = test_state();
        let body = QueryResultBody {
            correlation_id: "page_nope".to_string(),
            status: "completed".to_string(),
            result: Some(serde_json::json!({"ok": true})),
            error: None,
        };
        let response = query_results(State(state), Json(body)).await.unwrap();
        let ack: serde_json::Value = {
            use axum::response::IntoResponse;
            use http_body_util::BodyExt;
            let bytes = response.into_response().into_body().collect().await.unwrap().to_bytes();
            serde_json::from_slice(&bytes).unwrap()
        };
        assert_eq!(ack["acknowledged"], false);
    }

    #[tokio::test]
    async fn query_results_with_unknown_status_is_bad_request() {
        let state = test_state();
        let body = QueryResultBody {
            correlation_id: "page_1".to_string(),
            status: "sideways".to_string(),
            result: None,
            error: None,
        };
        assert!(query_results(State(state), Json(body)).await.is_err());
    }
}
