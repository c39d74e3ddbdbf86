//! The `gasoline` binary: a thin argument parser over the daemon and
//! bridge entry points in `gasoline-daemon`/`gasoline-mcp`. Kept as a plain
//! `fn main` (no `#[tokio::main]`) because `--daemon` forks before any
//! async runtime exists; forking a multi-threaded runtime is unsound.

use std::path::PathBuf;

use clap::Parser;

const DEFAULT_PORT: u16 = 47821;

/// Local browser-observability daemon and MCP bridge.
///
/// With no flags, runs as a short-lived stdio bridge that forwards JSON-RPC
/// to the daemon, spawning one on demand.
#[derive(Debug, Parser)]
#[clap(name = "gasoline", author, about)]
struct Cli {
    /// Background the process and run the HTTP/MCP daemon.
    #[arg(long)]
    daemon: bool,

    /// Listen port for the daemon, and the port a bridge connects to.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Stop the daemon running on `--port`.
    #[arg(long)]
    stop: bool,

    /// Print the version and exit.
    #[arg(long = "version")]
    print_version: bool,

    /// Run as a stdio bridge, spawning/connecting to the daemon on demand.
    /// This is also the default when no other flag is given.
    #[arg(long)]
    bridge: bool,

    /// Opt in to `/api/os-automation/inject`, which otherwise always 403s.
    #[arg(long = "enable-os-upload-automation")]
    enable_os_upload_automation: bool,

    /// Persisted noise rules path (default: `.gasoline/noise/rules.json`, cwd-relative).
    #[arg(long)]
    noise_rules_path: Option<PathBuf>,

    /// Draw-mode session directory (default: `.gasoline/sessions`, cwd-relative).
    #[arg(long)]
    sessions_dir: Option<PathBuf>,

    /// Key-value store directory (default: `.gasoline/kv`, cwd-relative).
    #[arg(long)]
    kv_dir: Option<PathBuf>,

    /// Optional path to a user redaction pattern catalog.
    #[arg(long)]
    redaction_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_version {
        println!("v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if cli.stop {
        return run_async(async move { gasoline_daemon::stop(cli.port).await.map_err(anyhow::Error::from) });
    }

    if cli.daemon {
        // Must happen before the tokio runtime is built.
        gasoline_daemon::daemonize()?;
        return run_async(run_daemon(cli));
    }

    run_async(run_bridge(cli))
}

fn run_async<F: std::future::Future<Output = anyhow::Result<()>>>(fut: F) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(fut)
}

fn daemon_config(cli: &Cli) -> anyhow::Result<gasoline_daemon::DaemonConfig> {
    let cwd = std::env::current_dir()?;
    Ok(gasoline_daemon::DaemonConfig {
        port: cli.port,
        version: env!("CARGO_PKG_VERSION").to_string(),
        os_automation_enabled: cli.enable_os_upload_automation,
        noise_rules_path: cli.noise_rules_path.clone().unwrap_or_else(|| cwd.join(".gasoline/noise/rules.json")),
        sessions_dir: cli.sessions_dir.clone().unwrap_or_else(|| cwd.join(".gasoline/sessions")),
        kv_dir: cli.kv_dir.clone().unwrap_or_else(|| cwd.join(".gasoline/kv")),
        redaction_config_path: cli.redaction_config.clone(),
    })
}

async fn run_daemon(cli: Cli) -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = daemon_config(&cli)?;

    if let Some(marker) = gasoline_daemon::read_upgrade_marker() {
        tracing::info!(from = %marker.from_version, to = %marker.to_version, detected_at = %marker.detected_at, "starting as successor of a detected upgrade");
    }

    let ctx = gasoline_daemon::build_context(&config);
    let current_binary = std::env::current_exe().ok();
    gasoline_daemon::run_http(ctx, config, current_binary).await
}

async fn run_bridge(cli: Cli) -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let port = cli.port;
    let daemon_config = daemon_config(&cli)?;
    gasoline_daemon::run_bridge(gasoline_daemon::BridgeConfig { port, daemon_config }).await
}
