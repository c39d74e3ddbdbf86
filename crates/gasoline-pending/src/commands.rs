//! Outbound browser commands (§4.5). Commands ride on the same correlation
//! registry as pending queries (`kind = "command"`), with pilot gating
//! layered on top and a triple-bucket view for observation.

use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::registry::DeliveredOutcome;
use crate::registry::PendingQueryView;
use crate::registry::Registry;
use crate::registry::Status;

const COMMAND_KIND: &str = "command";

/// The extension's most-recently reported capability state, refreshed on
/// every `/sync`. Must never default to pilot-enabled — a stale-true
/// default was the regression that let pilot-gated commands leak through
/// before the extension ever connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionState {
    pub pilot_enabled: bool,
    pub tracking_enabled: bool,
    pub initialized: bool,
}

pub struct ExtensionStateCache {
    inner: RwLock<ExtensionState>,
}

impl Default for ExtensionStateCache {
    fn default() -> Self {
        Self {
            inner: RwLock::new(ExtensionState::default()),
        }
    }
}

impl ExtensionStateCache {
    pub fn update(&self, pilot_enabled: bool, tracking_enabled: bool) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.pilot_enabled = pilot_enabled;
        state.tracking_enabled = tracking_enabled;
        state.initialized = true;
    }

    pub fn get(&self) -> ExtensionState {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub action: String,
    #[serde(default)]
    pub params: Value,
    pub pilot_required: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("pilot is disabled")]
    PilotDisabled,
}

pub struct CommandQueue {
    registry: Arc<Registry>,
    extension_state: Arc<ExtensionStateCache>,
    ttl: Duration,
}

impl CommandQueue {
    pub fn new(registry: Arc<Registry>, extension_state: Arc<ExtensionStateCache>, ttl: Duration) -> Self {
        Self {
            registry,
            extension_state,
            ttl,
        }
    }

    /// Enqueues a command unless it requires pilot and pilot is currently
    /// off, in which case it fails immediately without ever touching the
    /// registry.
    pub fn enqueue(
        &self,
        command: CommandRequest,
    ) -> Result<(String, oneshot::Receiver<DeliveredOutcome>), EnqueueError> {
        if command.pilot_required && !self.extension_state.get().pilot_enabled {
            return Err(EnqueueError::PilotDisabled);
        }
        let params = serde_json::json!({
            "action": command.action,
            "params": command.params,
            "pilot_required": command.pilot_required,
        });
        Ok(self.registry.create(COMMAND_KIND, params, self.ttl))
    }

    pub fn claim(&self, max_n: usize) -> Vec<PendingQueryView> {
        self.registry.claim(COMMAND_KIND, max_n)
    }

    pub fn complete(&self, correlation_id: &str, result: Value) -> bool {
        self.registry.complete(correlation_id, result)
    }

    pub fn fail(&self, correlation_id: &str, error: String) -> bool {
        self.registry.fail(correlation_id, error)
    }

    pub fn get(&self, correlation_id: &str) -> Option<PendingQueryView> {
        self.registry.get(correlation_id)
    }

    /// `pending` bucket: queued or claimed (delivered) but not terminal.
    pub fn pending(&self) -> Vec<PendingQueryView> {
        let mut queued = self.registry.list_by_status(COMMAND_KIND, Status::Queued);
        queued.extend(self.registry.list_by_status(COMMAND_KIND, Status::Claimed));
        queued
    }

    pub fn completed(&self) -> Vec<PendingQueryView> {
        self.registry.list_by_status(COMMAND_KIND, Status::Completed)
    }

    pub fn failed(&self) -> Vec<PendingQueryView> {
        let mut failed = self.registry.list_by_status(COMMAND_KIND, Status::Failed);
        failed.extend(self.registry.list_by_status(COMMAND_KIND, Status::TimedOut));
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pilot_gated_command_fails_before_queueing_when_disabled() {
        let registry = Arc::new(Registry::new());
        let state = Arc::new(ExtensionStateCache::default());
        let queue = CommandQueue::new(registry, state, Duration::from_secs(5));

        let result = queue.enqueue(CommandRequest {
            action: "navigate".to_string(),
            params: Value::Null,
            pilot_required: true,
        });
        assert!(matches!(result, Err(EnqueueError::PilotDisabled)));
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn extension_state_cache_does_not_default_to_pilot_enabled() {
        let cache = ExtensionStateCache::default();
        assert!(!cache.get().pilot_enabled);
        assert!(!cache.get().initialized);
    }

    #[test]
    fn non_pilot_command_enqueues_regardless_of_pilot_state() {
        let registry = Arc::new(Registry::new());
        let state = Arc::new(ExtensionStateCache::default());
        let queue = CommandQueue::new(registry, state, Duration::from_secs(5));

        let (id, _rx) = queue
            .enqueue(CommandRequest {
                action: "get_text".to_string(),
                params: Value::Null,
                pilot_required: false,
            })
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(queue.pending().len(), 1);
    }
}
