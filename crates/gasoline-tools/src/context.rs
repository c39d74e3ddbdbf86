//! Shared handle to every subsystem a tool handler might touch. One
//! `AppContext` is constructed at daemon startup and cloned (cheaply, via
//! `Arc`) into the MCP dispatcher and the HTTP ingestion surface alike.

use std::sync::Arc;
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

pub const INTERACT_STATES_NS: &str = "interact_states";
pub const CONFIGURE_STORE_NS: &str = "configure_store";

#[derive(Clone)]
pub struct AppContext {
    pub buffers: Arc<BufferSet>,
    pub redactor: Arc<Redactor>,
    pub noise: Arc<NoiseStore>,
    pub registry: Arc<Registry>,
    pub commands: Arc<CommandQueue>,
    pub extension_state: Arc<ExtensionStateCache>,
    pub sessions: Arc<SessionStore>,
    pub element_details: Arc<ElementDetailCache>,
    pub kv: Arc<KvStore>,
    pub pending_ttl: Duration,
    pub version: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppContext {
    /// Looks up the extension's most recent connectivity signal. Used by
    /// `configure(health)` and the HTTP `/health` endpoint alike.
    pub fn extension_connected(&self) -> bool {
        self.extension_state.get().initialized
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn test_context() -> AppContext {
        let dir = tempfile::tempdir().unwrap().into_path();
        let registry = Arc::new(Registry::new());
        let extension_state = Arc::new(ExtensionStateCache::default());
        let pending_ttl = Duration::from_secs(5);

        AppContext {
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
        }
    }
}
