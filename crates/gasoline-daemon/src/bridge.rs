//! Positional/`--bridge` stdio mode (§6): "spawns/connects to the daemon on
//! demand". If a daemon already answers on the configured port, this
//! process becomes a thin stdio<->HTTP forwarder so many MCP connections
//! can share its buffers and command queue. Otherwise this process *is*
//! the daemon: it binds the HTTP surface for the browser extension and
//! speaks MCP directly over its own stdio for the AI client that spawned
//! it (`run_embedded`).

use std::time::Duration;

use gasoline_protocol::JSONRPCMessage;
use tokio::io;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::DaemonConfig;

const CHANNEL_CAPACITY: usize = 128;
const STARTUP_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

pub struct BridgeConfig {
    pub port: u16,
    pub daemon_config: DaemonConfig,
}

pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let client = reqwest::Client::builder().timeout(STARTUP_CHECK_TIMEOUT).build()?;
    let base_url = format!("http://127.0.0.1:{}", config.port);

    if is_daemon_up(&client, &base_url).await {
        info!(%base_url, "daemon already running, bridging stdio to it");
        return forward(&base_url).await;
    }

    info!(port = config.port, "no daemon found, running embedded on this process's stdio");
    let ctx = crate::build_context(&config.daemon_config);
    let current_binary = std::env::current_exe().ok();
    crate::run_embedded(ctx, config.daemon_config, current_binary).await
}

async fn is_daemon_up(client: &reqwest::Client, base_url: &str) -> bool {
    client
        .get(format!("{base_url}/health"))
        .timeout(STARTUP_CHECK_TIMEOUT)
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

async fn forward(base_url: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
    let base_url = base_url.to_string();

    let (incoming_tx, mut incoming_rx) = tokio::sync::mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);
    let (outgoing_tx, mut outgoing_rx) = tokio::sync::mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);

    let stdin_handle = tokio::spawn(async move {
        let stdin = io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.unwrap_or_default() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JSONRPCMessage>(&line) {
                Ok(msg) => {
                    if incoming_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("failed to parse JSON-RPC line: {e}"),
            }
        }

        debug!("bridge stdin reader finished (EOF)");
    });

    let forward_handle = tokio::spawn(async move {
        while let Some(msg) = incoming_rx.recv().await {
            let JSONRPCMessage::Request(request) = msg else {
                continue;
            };

            match client.post(format!("{base_url}/mcp")).json(&request).send().await {
                Ok(resp) => match resp.json::<JSONRPCMessage>().await {
                    Ok(response) => {
                        if outgoing_tx.send(response).await.is_err() {
                            warn!("outgoing channel closed before response could be forwarded");
                        }
                    }
                    Err(e) => error!("daemon returned an unparseable response: {e}"),
                },
                Err(e) => error!("failed to reach daemon at {base_url}: {e}"),
            }
        }

        info!("bridge forwarding task exited (channel closed)");
    });

    let stdout_handle = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(msg) = outgoing_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    let _ = stdout.write_all(json.as_bytes()).await;
                    let _ = stdout.write_all(b"\n").await;
                    let _ = stdout.flush().await;
                }
                Err(e) => error!("failed to serialize JSON-RPC message: {e}"),
            }
        }
    });

    let _ = tokio::join!(stdin_handle, forward_handle, stdout_handle);
    Ok(())
}
