//! The daemon's HTTP surface (§4.6): the browser extension's transport for
//! event ingestion and command polling, plus an HTTP mirror of the MCP
//! dispatcher and a handful of operator endpoints. Every route is guarded
//! against DNS rebinding; the extension-facing subset additionally requires
//! the `X-Gasoline-Client` header.

mod admin;
mod auth;
mod draw;
mod error;
mod files;
mod guard;
mod ingest;
mod pending;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::HttpState;
pub use state::UpgradePending;

/// Builds the full router. `state.os_automation_enabled` gates
/// `/api/os-automation/inject`, which is otherwise wired up unconditionally
/// and rejects at request time — see `files::os_automation_inject`.
pub fn build_router(state: Arc<HttpState>) -> Router {
    let extension_routes = Router::new()
        .route("/logs", post(ingest::logs))
        .route("/network-bodies", post(ingest::network_bodies))
        .route("/network-waterfall", post(ingest::network_waterfall))
        .route("/enhanced-actions", post(ingest::enhanced_actions))
        .route("/websocket-events", post(ingest::websocket_events))
        .route("/performance-snapshots", post(ingest::performance_snapshots))
        .route("/extension-logs", post(ingest::extension_logs))
        .route("/pending-queries", get(pending::pending_queries))
        .route("/query-results", post(pending::query_results))
        .route("/command-results", post(pending::command_results))
        .route("/sync", post(pending::sync))
        .route("/draw-mode/complete", post(draw::draw_mode_complete))
        .route("/api/file/read", post(files::file_read))
        .route("/api/form/submit", post(files::form_submit))
        .route("/api/os-automation/inject", post(files::os_automation_inject))
        .route_layer(middleware::from_fn(auth::require_extension_client));

    let open_routes = Router::new()
        .route("/health", get(admin::health))
        .route("/diagnostics", get(admin::diagnostics))
        .route("/mcp", post(admin::mcp))
        .route("/shutdown", post(admin::shutdown));

    Router::new()
        .merge(extension_routes)
        .merge(open_routes)
        .route_layer(middleware::from_fn(guard::loopback_only))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves `router` on `listener` until the state's shutdown notifier fires,
/// then drains in-flight requests and returns.
pub async fn serve(listener: tokio::net::TcpListener, router: Router, shutdown: Arc<tokio::sync::Notify>) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await
}
