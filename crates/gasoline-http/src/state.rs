//! Shared state for every axum handler: the same `AppContext` the MCP
//! dispatcher uses, plus the HTTP surface's own concerns (the upload-
//! automation opt-in gate, graceful shutdown, and the upgrade watcher's
//! handoff into `/health`).

use std::sync::Arc;
use std::sync::RwLock;

use gasoline_tools::AppContext;
use serde::Serialize;
use tokio::sync::Notify;

/// Recorded by the daemon's upgrade watcher (C10) and surfaced verbatim in
/// `/health` until the process exits.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradePending {
    pub new_version: String,
}

#[derive(Clone)]
pub struct HttpState {
    pub ctx: AppContext,
    pub os_automation_enabled: bool,
    pub upgrade_pending: Arc<RwLock<Option<UpgradePending>>>,
    pub shutdown: Arc<Notify>,
}

impl HttpState {
    pub fn new(ctx: AppContext, os_automation_enabled: bool) -> Self {
        Self {
            ctx,
            os_automation_enabled,
            upgrade_pending: Arc::new(RwLock::new(None)),
            shutdown: Arc::new(Notify::new()),
        }
    }
}
