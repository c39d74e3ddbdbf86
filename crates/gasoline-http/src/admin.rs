//! Unauthenticated-but-loopback-guarded endpoints (§4.6): health/diagnostics
//! for humans and supervisors, the HTTP transport for the MCP dispatcher,
//! and the shutdown trigger.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use gasoline_protocol::JSONRPCRequest;
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::HttpState;

#[derive(Debug, Serialize)]
struct CaptureStatus {
    pilot_enabled: bool,
    tracking_enabled: bool,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_seconds: i64,
    extension_connected: bool,
    capture: CaptureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    upgrade_pending: Option<crate::state::UpgradePending>,
}

pub async fn health(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let extension_state = state.ctx.extension_state.get();
    let uptime_seconds = (chrono::Utc::now() - state.ctx.started_at).num_seconds().max(0);
    let upgrade_pending = state.upgrade_pending.read().unwrap().clone();

    Json(HealthResponse {
        status: "ok",
        version: state.ctx.version.clone(),
        uptime_seconds,
        extension_connected: state.ctx.extension_connected(),
        capture: CaptureStatus {
            pilot_enabled: extension_state.pilot_enabled,
            tracking_enabled: extension_state.tracking_enabled,
        },
        upgrade_pending,
    })
}

pub async fn diagnostics(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let extension_state = state.ctx.extension_state.get();

    Json(json!({
        "version": state.ctx.version,
        "uptime_seconds": (chrono::Utc::now() - state.ctx.started_at).num_seconds().max(0),
        "extension": {
            "connected": state.ctx.extension_connected(),
            "pilot_enabled": extension_state.pilot_enabled,
            "tracking_enabled": extension_state.tracking_enabled,
        },
        "buffers": {
            "console_logs": state.ctx.buffers.console_logs.len(),
            "network_waterfall": state.ctx.buffers.network_waterfall.len(),
            "network_bodies": state.ctx.buffers.network_bodies.len(),
            "websocket_events": state.ctx.buffers.websocket_events.len(),
            "actions": state.ctx.buffers.actions.len(),
            "performance": state.ctx.buffers.performance.len(),
            "extension_logs": state.ctx.buffers.extension_logs.len(),
        },
        "commands": {
            "pending": state.ctx.commands.pending().len(),
            "completed": state.ctx.commands.completed().len(),
            "failed": state.ctx.commands.failed().len(),
        },
        "os_automation_enabled": state.os_automation_enabled,
    }))
}

pub async fn mcp(
    State(state): State<Arc<HttpState>>,
    Json(request): Json<JSONRPCRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = gasoline_mcp::handle_request(&state.ctx, true, request).await;
    Ok(Json(message))
}

#[derive(Debug, Serialize)]
struct ShutdownResponse {
    status: &'static str,
}

pub async fn shutdown(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    state.shutdown.notify_one();
    Json(ShutdownResponse { status: "shutting_down" })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::response::IntoResponse;
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

    async fn body_of(response: impl IntoResponse) -> serde_json::Value {
        use http_body_util::BodyExt;
        let response = response.into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_never_defaults_pilot_enabled_before_first_sync() {
        let state = test_state();
        let body = body_of(health(State(state)).await).await;
        assert_eq!(body["capture"]["pilot_enabled"], false);
        assert_eq!(body["extension_connected"], false);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn diagnostics_reports_empty_command_buckets_for_a_fresh_context() {
        let state = test_state();
        let body = body_of(diagnostics(State(state)).await).await;
        assert_eq!(body["commands"]["pending"], 0);
        assert_eq!(body["commands"]["completed"], 0);
        assert_eq!(body["commands"]["failed"], 0);
        assert_eq!(body["os_automation_enabled"], false);
    }
}
