//! `observe {what, …filters}` (§4.9). Buffer-backed modes answer from a
//! ring-buffer snapshot immediately; modes that need live browser state
//! park a pending query on C4 and block up to the daemon's TTL, surfacing
//! `bridge_timeout` if the extension never answers (§8 scenario 6).

use gasoline_events::ConsoleLevel;
use gasoline_events::EventFilter;
use gasoline_events::EventPayload;
use gasoline_pending::WaitResult;
use gasoline_pending::wait;
use gasoline_protocol::CallToolResult;
use gasoline_protocol::ToolError;
use serde_json::Value;
use serde_json::json;

use crate::context::AppContext;
use crate::params::optional_i64;
use crate::params::optional_str;
use crate::params::optional_u64;
use crate::params::require_str;

const VALID_MODES: &[&str] = &[
    "page",
    "tabs",
    "logs",
    "errors",
    "network_waterfall",
    "vitals",
    "actions",
    "websocket_events",
    "websocket_status",
    "extension_logs",
    "pilot",
    "performance",
    "timeline",
    "error_clusters",
    "history",
    "accessibility",
    "security_audit",
    "third_party_audit",
    "pending_commands",
    "failed_commands",
    "network_bodies",
    "recordings",
    "command_result",
    "saved_videos",
    "error_bundles",
    "screenshot",
];

/// Modes answered live by the extension rather than from a ring buffer.
const LIVE_MODES: &[&str] = &[
    "page",
    "tabs",
    "network_waterfall",
    "vitals",
    "websocket_status",
    "pilot",
    "history",
    "accessibility",
    "security_audit",
    "third_party_audit",
    "recordings",
    "saved_videos",
    "error_bundles",
    "screenshot",
];

pub async fn handle(ctx: &AppContext, params: Value) -> CallToolResult {
    let what = match require_str(&params, "what") {
        Ok(w) => w,
        Err(e) => return CallToolResult::error(e),
    };

    if !VALID_MODES.contains(&what) {
        return CallToolResult::error(ToolError::unknown_mode(what, VALID_MODES));
    }

    let filter = filter_from_params(&params);

    match what {
        "logs" => snapshot_response(ctx, &ctx.buffers.console_logs, &filter),
        "errors" => {
            let mut f = filter;
            f.min_level.get_or_insert(ConsoleLevel::Error);
            snapshot_response(ctx, &ctx.buffers.console_logs, &f)
        }
        "actions" => snapshot_response(ctx, &ctx.buffers.actions, &filter),
        "websocket_events" => snapshot_response(ctx, &ctx.buffers.websocket_events, &filter),
        "extension_logs" => snapshot_response(ctx, &ctx.buffers.extension_logs, &filter),
        "network_bodies" => snapshot_response(ctx, &ctx.buffers.network_bodies, &filter),
        "performance" => snapshot_response(ctx, &ctx.buffers.performance, &filter),
        "timeline" => timeline(ctx, &filter),
        "error_clusters" => error_clusters(ctx, &filter),
        "pending_commands" => {
            let items = ctx.commands.pending();
            CallToolResult::json(&json!({"commands": items, "count": items.len()}))
        }
        "failed_commands" => {
            let items = ctx.commands.failed();
            CallToolResult::json(&json!({"commands": items, "count": items.len()}))
        }
        "command_result" => command_result(ctx, &params),
        mode if LIVE_MODES.contains(&mode) => live_mode(ctx, mode, &params).await,
        _ => CallToolResult::error(ToolError::unknown_mode(what, VALID_MODES)),
    }
}

fn filter_from_params(params: &Value) -> EventFilter {
    let min_level = optional_str(params, "min_level").and_then(parse_level);
    let limit = optional_u64(params, "limit").map(|n| n as usize);
    let match_substr = optional_str(params, "match").map(str::to_string);
    let since_ts = optional_i64(params, "since_ts");
    EventFilter {
        min_level,
        limit,
        match_substr,
        since_ts,
    }
}

fn parse_level(s: &str) -> Option<ConsoleLevel> {
    match s {
        "log" => Some(ConsoleLevel::Log),
        "info" => Some(ConsoleLevel::Info),
        "warn" => Some(ConsoleLevel::Warn),
        "error" => Some(ConsoleLevel::Error),
        "debug" => Some(ConsoleLevel::Debug),
        _ => None,
    }
}

fn snapshot_response(
    _ctx: &AppContext,
    buffer: &gasoline_events::RingBuffer,
    filter: &EventFilter,
) -> CallToolResult {
    let items = buffer.snapshot(filter);
    CallToolResult::json(&json!({"events": items, "count": items.len()}))
}

/// Cross-buffer merge tolerating mild clock skew between sources (§9).
fn timeline(ctx: &AppContext, filter: &EventFilter) -> CallToolResult {
    let mut items = ctx.buffers.console_logs.snapshot(filter);
    items.extend(ctx.buffers.actions.snapshot(filter));
    items.extend(ctx.buffers.websocket_events.snapshot(filter));
    items.extend(ctx.buffers.network_waterfall.snapshot(filter));
    items.sort_by_key(|e| e.timestamp);
    if let Some(limit) = filter.limit {
        items.truncate(limit);
    }
    CallToolResult::json(&json!({"events": items, "count": items.len()}))
}

/// Groups console errors by identical message text, the simplest possible
/// clustering that still surfaces repeat-offender errors.
fn error_clusters(ctx: &AppContext, filter: &EventFilter) -> CallToolResult {
    let mut f = filter.clone();
    f.min_level.get_or_insert(ConsoleLevel::Error);
    let events = ctx.buffers.console_logs.snapshot(&f);

    let mut clusters: Vec<(String, usize)> = Vec::new();
    for event in &events {
        if let EventPayload::ConsoleLog(log) = &event.payload {
            match clusters.iter_mut().find(|(msg, _)| msg == &log.message) {
                Some((_, count)) => *count += 1,
                None => clusters.push((log.message.clone(), 1)),
            }
        }
    }
    clusters.sort_by(|a, b| b.1.cmp(&a.1));
    let clusters: Vec<Value> = clusters
        .into_iter()
        .map(|(message, count)| json!({"message": message, "count": count}))
        .collect();
    CallToolResult::json(&json!({"clusters": clusters}))
}

fn command_result(ctx: &AppContext, params: &Value) -> CallToolResult {
    let correlation_id = match require_str(params, "correlation_id") {
        Ok(id) => id,
        Err(e) => return CallToolResult::error(e),
    };
    match ctx.commands.get(correlation_id) {
        Some(view) => CallToolResult::json(&view),
        None => CallToolResult::error(ToolError::not_found(format!(
            "no command with correlation_id '{correlation_id}'"
        ))),
    }
}

/// Parks a pending query for a mode that only the extension can answer and
/// blocks up to the daemon's TTL.
async fn live_mode(ctx: &AppContext, mode: &str, params: &Value) -> CallToolResult {
    let (_correlation_id, rx) = ctx.registry.create(mode, params.clone(), ctx.pending_ttl);
    match wait(rx, ctx.pending_ttl).await {
        WaitResult::Completed(v) => CallToolResult::json(&v),
        WaitResult::Failed(e) => CallToolResult::error(ToolError::internal(e)),
        WaitResult::TimedOut => CallToolResult::error(ToolError::bridge_timeout()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::test_context;

    #[tokio::test]
    async fn unknown_mode_lists_valid_values() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"what": "nonsense"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("unknown_mode"));
    }

    #[tokio::test]
    async fn missing_what_reports_missing_param() {
        let ctx = test_context();
        let result = handle(&ctx, json!({})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("what"));
    }

    #[tokio::test]
    async fn empty_logs_buffer_is_a_success_envelope_not_an_error() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"what": "logs"})).await;
        assert!(!result.is_error);
        assert!(result.content[0].text.contains("\"count\":0"));
    }

    #[tokio::test]
    async fn command_result_unknown_correlation_id_is_not_found() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"what": "command_result", "correlation_id": "command_nope"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("not_found"));
    }

    #[tokio::test]
    async fn live_mode_times_out_when_extension_never_answers() {
        let mut ctx = test_context();
        ctx.pending_ttl = std::time::Duration::from_millis(20);
        let result = handle(&ctx, json!({"what": "pilot"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("bridge_timeout"));
    }
}
