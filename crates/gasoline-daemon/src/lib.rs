//! Process lifecycle: daemonization, PID files, the dynamic upgrade
//! watcher, and wiring the MCP dispatcher and HTTP surface onto one shared
//! `AppContext` (§4.10).

mod bridge;
mod daemonize;
mod lifecycle;
mod paths;
mod pidfile;
mod upgrade;

pub use bridge::BridgeConfig;
pub use bridge::run as run_bridge;
pub use daemonize::daemonize;
pub use lifecycle::StopError;
pub use lifecycle::stop;
pub use paths::pid_file_path;
pub use upgrade::UpgradeMarker;
pub use upgrade::read_marker as read_upgrade_marker;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gasoline_events::BufferSet;
use gasoline_http::HttpState;
use gasoline_noise::NoiseStore;
use gasoline_pending::CommandQueue;
use gasoline_pending::ExtensionStateCache;
use gasoline_pending::Registry;
use gasoline_redact::Redactor;
use gasoline_store::ElementDetailCache;
use gasoline_store::KvStore;
use gasoline_store::SessionStore;
use gasoline_tools::AppContext;

const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(20);
const ELEMENT_DETAIL_TTL: Duration = Duration::from_secs(300);

pub struct DaemonConfig {
    pub port: u16,
    pub version: String,
    pub os_automation_enabled: bool,
    pub noise_rules_path: PathBuf,
    pub sessions_dir: PathBuf,
    pub kv_dir: PathBuf,
    pub redaction_config_path: Option<PathBuf>,
}

/// Builds the shared `AppContext` every surface (MCP stdio, MCP-over-HTTP,
/// the ingestion routes) dispatches through.
pub fn build_context(config: &DaemonConfig) -> AppContext {
    let registry = Arc::new(Registry::new());
    let extension_state = Arc::new(ExtensionStateCache::default());
    let redactor = match &config.redaction_config_path {
        Some(path) => Arc::new(Redactor::from_config_file(path)),
        None => Arc::new(Redactor::default()),
    };

    AppContext {
        buffers: Arc::new(BufferSet::default()),
        redactor,
        noise: Arc::new(NoiseStore::load(config.noise_rules_path.clone())),
        commands: Arc::new(CommandQueue::new(registry.clone(), extension_state.clone(), DEFAULT_PENDING_TTL)),
        registry,
        extension_state,
        sessions: Arc::new(SessionStore::new(config.sessions_dir.clone())),
        element_details: Arc::new(ElementDetailCache::new(ELEMENT_DETAIL_TTL)),
        kv: Arc::new(KvStore::new(config.kv_dir.clone())),
        pending_ttl: DEFAULT_PENDING_TTL,
        version: config.version.clone(),
        started_at: chrono::Utc::now(),
    }
}

/// Runs the HTTP surface until `/shutdown` (or the upgrade watcher) signals
/// it to stop, writing and removing the PID file around the run. This is
/// what `--daemon` runs once backgrounded.
pub async fn run_http(ctx: AppContext, config: DaemonConfig, current_binary: Option<PathBuf>) -> anyhow::Result<()> {
    let pid = std::process::id() as i32;
    pidfile::write(config.port, pid)?;

    let version = ctx.version.clone();
    let state = Arc::new(HttpState::new(ctx, config.os_automation_enabled));

    let watcher_handle = current_binary.map(|path| {
        upgrade::spawn(path, version, state.upgrade_pending.clone(), state.shutdown.clone())
    });

    let addr: SocketAddr = ([127, 0, 0, 1], config.port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gasoline daemon listening");

    let router = gasoline_http::build_router(state.clone());
    let shutdown = state.shutdown.clone();
    gasoline_http::serve(listener, router, shutdown).await?;

    if let Some(handle) = watcher_handle {
        handle.abort();
    }
    pidfile::remove(config.port)?;
    Ok(())
}

/// Runs the HTTP surface in the background of the current process while
/// this task speaks MCP directly over stdio on the same `AppContext` — the
/// shape the bare `gasoline` invocation takes when no daemon is already
/// listening on `config.port`: the AI client owns this process's stdio,
/// and the browser extension connects to the HTTP surface it also exposes.
/// Stdin EOF (the AI client disconnecting) tears the HTTP side down too.
pub async fn run_embedded(ctx: AppContext, config: DaemonConfig, current_binary: Option<PathBuf>) -> anyhow::Result<()> {
    let pid = std::process::id() as i32;
    pidfile::write(config.port, pid)?;

    let version = ctx.version.clone();
    let state = Arc::new(HttpState::new(ctx.clone(), config.os_automation_enabled));

    let watcher_handle = current_binary.map(|path| {
        upgrade::spawn(path, version, state.upgrade_pending.clone(), state.shutdown.clone())
    });

    let addr: SocketAddr = ([127, 0, 0, 1], config.port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gasoline daemon listening (embedded, stdio-attached)");

    let router = gasoline_http::build_router(state.clone());
    let shutdown = state.shutdown.clone();
    let http_handle = tokio::spawn(async move { gasoline_http::serve(listener, router, shutdown).await });

    let stdio_result = gasoline_mcp::run_stdio(ctx).await;
    state.shutdown.notify_one();
    let _ = http_handle.await;

    if let Some(handle) = watcher_handle {
        handle.abort();
    }
    pidfile::remove(config.port)?;
    stdio_result.map_err(anyhow::Error::from)
}
