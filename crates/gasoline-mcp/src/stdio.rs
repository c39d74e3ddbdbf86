//! Line-delimited JSON-RPC over stdio. Three tasks — read, process, write —
//! joined by bounded channels, the same shape used by every stdio MCP
//! server: stdin EOF drops the incoming sender, which drains the processor,
//! which drops the outgoing sender, which lets the writer finish. Nothing
//! but JSON-RPC may ever touch stdout (§6): logs go to stderr exclusively.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use gasoline_protocol::JSONRPCMessage;
use gasoline_tools::AppContext;
use tokio::io;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 128;

pub async fn run(ctx: AppContext) -> io::Result<()> {
    let (incoming_tx, mut incoming_rx) = mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);

    let stdin_reader_handle = tokio::spawn({
        let incoming_tx = incoming_tx.clone();
        async move {
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

            debug!("stdin reader finished (EOF)");
        }
    });

    let processor_handle = tokio::spawn({
        let initialized = Arc::new(AtomicBool::new(false));
        async move {
            while let Some(msg) = incoming_rx.recv().await {
                let JSONRPCMessage::Request(request) = msg else {
                    // Responses/notifications from the peer: nothing to do yet.
                    continue;
                };

                let ctx = ctx.clone();
                let outgoing_tx = outgoing_tx.clone();
                let initialized = initialized.clone();
                let is_initialize = request.method == "initialize";

                tokio::spawn(async move {
                    let already_initialized = if is_initialize {
                        initialized.swap(true, Ordering::SeqCst)
                    } else {
                        initialized.load(Ordering::SeqCst)
                    };
                    let response = crate::dispatcher::handle_request(&ctx, already_initialized, request).await;
                    if outgoing_tx.send(response).await.is_err() {
                        warn!("outgoing channel closed before response could be sent");
                    }
                });
            }

            info!("processor task exited (channel closed)");
        }
    });

    let stdout_writer_handle = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(msg) = outgoing_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if let Err(e) = stdout.write_all(json.as_bytes()).await {
                        error!("failed to write to stdout: {e}");
                        break;
                    }
                    if let Err(e) = stdout.write_all(b"\n").await {
                        error!("failed to write newline to stdout: {e}");
                        break;
                    }
                    if let Err(e) = stdout.flush().await {
                        error!("failed to flush stdout: {e}");
                        break;
                    }
                }
                Err(e) => error!("failed to serialize JSON-RPC message: {e}"),
            }
        }

        info!("stdout writer exited (channel closed)");
    });

    let _ = tokio::join!(stdin_reader_handle, processor_handle, stdout_writer_handle);
    Ok(())
}
