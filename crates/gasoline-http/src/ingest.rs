//! Extension-authenticated ingest endpoints (§4.6): each accepts a batch of
//! typed entries, redacts every string field, and appends to the matching
//! ring buffer. Empty arrays are accepted as a no-op; malformed JSON is 400.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use gasoline_events::Action;
use gasoline_events::ConsoleLog;
use gasoline_events::Event;
use gasoline_events::EventPayload;
use gasoline_events::NetworkBody;
use gasoline_events::PerfSnapshot;
use gasoline_events::WSEvent;
use gasoline_redact::Redactor;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::HttpState;

fn redact_entry(redactor: &Redactor, entry: Value) -> Value {
    match entry {
        Value::Object(map) => Value::Object(redactor.redact_map(&map)),
        other => other,
    }
}

fn parse_entries<T: for<'de> Deserialize<'de>>(redactor: &Redactor, raw: Vec<Value>) -> Result<Vec<T>, ApiError> {
    raw.into_iter()
        .map(|entry| {
            let redacted = redact_entry(redactor, entry);
            serde_json::from_value(redacted).map_err(|e| ApiError::bad_request(format!("malformed entry: {e}")))
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct Accepted {
    accepted: usize,
}

#[derive(Debug, Deserialize)]
struct LogsBody {
    #[serde(default)]
    entries: Vec<Value>,
}

pub async fn logs(State(state): State<Arc<HttpState>>, Json(body): Json<LogsBody>) -> Result<impl IntoResponse, ApiError> {
    let entries: Vec<ConsoleLog> = parse_entries(&state.ctx.redactor, body.entries)?;
    let count = entries.len();
    for entry in entries {
        state.ctx.buffers.console_logs.append(Event::new("console", EventPayload::ConsoleLog(entry)));
    }
    Ok(Json(Accepted { accepted: count }))
}

#[derive(Debug, Deserialize)]
struct BodiesBody {
    #[serde(default)]
    bodies: Vec<Value>,
}

pub async fn network_bodies(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<BodiesBody>,
) -> Result<impl IntoResponse, ApiError> {
    let entries: Vec<NetworkBody> = parse_entries(&state.ctx.redactor, body.bodies)?;
    let count = entries.len();
    for entry in entries {
        state
            .ctx
            .buffers
            .network_bodies
            .append(Event::new("network_body", EventPayload::NetworkBody(entry)));
    }
    Ok(Json(Accepted { accepted: count }))
}

/// Wire shape for a waterfall entry: the extension reports `duration`,
/// which every read path renames to `duration_ms` (§6).
#[derive(Debug, Deserialize)]
struct WaterfallEntryWire {
    url: String,
    initiator_type: String,
    duration: f64,
    start_time_ms: f64,
    transfer_size: u64,
    decoded_body_size: u64,
    encoded_body_size: u64,
}

#[derive(Debug, Deserialize)]
struct WaterfallBody {
    #[serde(default)]
    entries: Vec<Value>,
}

pub async fn network_waterfall(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<WaterfallBody>,
) -> Result<impl IntoResponse, ApiError> {
    let entries: Vec<WaterfallEntryWire> = parse_entries(&state.ctx.redactor, body.entries)?;
    let count = entries.len();
    for wire in entries {
        let entry = gasoline_events::NetworkWaterfallEntry {
            url: wire.url,
            initiator_type: wire.initiator_type,
            duration_ms: wire.duration,
            start_time_ms: wire.start_time_ms,
            transfer_size: wire.transfer_size,
            decoded_body_size: wire.decoded_body_size,
            encoded_body_size: wire.encoded_body_size,
        };
        state
            .ctx
            .buffers
            .network_waterfall
            .append(Event::new("network_waterfall", EventPayload::NetworkWaterfallEntry(entry)));
    }
    Ok(Json(Accepted { accepted: count }))
}

#[derive(Debug, Deserialize)]
struct ActionsBody {
    #[serde(default)]
    actions: Vec<Value>,
}

pub async fn enhanced_actions(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<ActionsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let entries: Vec<Action> = parse_entries(&state.ctx.redactor, body.actions)?;
    let count = entries.len();
    for entry in entries {
        state.ctx.buffers.actions.append(Event::new("action", EventPayload::Action(entry)));
    }
    Ok(Json(Accepted { accepted: count }))
}

#[derive(Debug, Deserialize)]
struct WsEventsBody {
    #[serde(default)]
    events: Vec<Value>,
}

pub async fn websocket_events(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<WsEventsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let entries: Vec<WSEvent> = parse_entries(&state.ctx.redactor, body.events)?;
    let count = entries.len();
    for entry in entries {
        state
            .ctx
            .buffers
            .websocket_events
            .append(Event::new("websocket", EventPayload::WSEvent(entry)));
    }
    Ok(Json(Accepted { accepted: count }))
}

#[derive(Debug, Deserialize)]
struct SnapshotsBody {
    #[serde(default)]
    snapshots: Vec<Value>,
}

pub async fn performance_snapshots(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<SnapshotsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let entries: Vec<PerfSnapshot> = parse_entries(&state.ctx.redactor, body.snapshots)?;
    let count = entries.len();
    for entry in entries {
        state
            .ctx
            .buffers
            .performance
            .append(Event::new("performance", EventPayload::PerfSnapshot(entry)));
    }
    Ok(Json(Accepted { accepted: count }))
}

#[derive(Debug, Deserialize)]
struct ExtensionLogsBody {
    #[serde(default)]
    logs: Vec<Value>,
}

pub async fn extension_logs(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<ExtensionLogsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let entries: Vec<ConsoleLog> = parse_entries(&state.ctx.redactor, body.logs)?;
    let count = entries.len();
    for entry in entries {
        state
            .ctx
            .buffers
            .extension_logs
            .append(Event::new("extension_log", EventPayload::ConsoleLog(entry)));
    }
    Ok(Json(Accepted { accepted: count }))
}
