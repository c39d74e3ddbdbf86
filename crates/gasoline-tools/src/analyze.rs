//! `analyze {what, …}` (§4.9). Most modes read directly from the stores;
//! `link_health` requires the extension to actually fetch external URLs, so
//! it parks on C4 and returns immediately rather than blocking the caller.

use gasoline_events::EventPayload;
use gasoline_protocol::CallToolResult;
use gasoline_protocol::ToolError;
use serde_json::Value;
use serde_json::json;

use crate::context::AppContext;
use crate::params::optional_str;
use crate::params::require_str;

const VALID_MODES: &[&str] = &[
    "link_health",
    "annotations",
    "annotation_detail",
    "draw_history",
    "draw_session",
    "performance",
];

pub async fn handle(ctx: &AppContext, params: Value) -> CallToolResult {
    let what = match require_str(&params, "what") {
        Ok(w) => w,
        Err(e) => return CallToolResult::error(e),
    };

    if !VALID_MODES.contains(&what) {
        return CallToolResult::error(ToolError::unknown_mode(what, VALID_MODES));
    }

    match what {
        "link_health" => link_health(ctx, &params),
        "annotations" => annotations(ctx),
        "annotation_detail" => annotation_detail(ctx, &params),
        "draw_history" => draw_history(ctx),
        "draw_session" => draw_session(ctx, &params),
        "performance" => performance(ctx),
        _ => unreachable!("validated above"),
    }
}

/// Checking outbound link health requires the extension to issue requests
/// from the page context; this is a genuinely long-running analysis, so it
/// is parked and reported back as queued rather than blocked on.
fn link_health(ctx: &AppContext, params: &Value) -> CallToolResult {
    let (correlation_id, _rx) = ctx.registry.create("link_health", params.clone(), ctx.pending_ttl);
    CallToolResult::json(&json!({
        "status": "queued",
        "correlation_id": correlation_id,
        "hint": "poll observe(command_result) with this correlation_id once the extension reports back",
    }))
}

fn annotations(ctx: &AppContext) -> CallToolResult {
    let files = match ctx.sessions.list() {
        Ok(f) => f,
        Err(e) => return CallToolResult::error(ToolError::internal(e.to_string())),
    };
    let mut all = Vec::new();
    for file in &files {
        if let Ok(session) = ctx.sessions.read(file) {
            all.extend(session.annotations);
        }
    }
    CallToolResult::json(&json!({"annotations": all, "count": all.len()}))
}

fn annotation_detail(ctx: &AppContext, params: &Value) -> CallToolResult {
    let correlation_id = match require_str(params, "correlation_id") {
        Ok(id) => id,
        Err(e) => return CallToolResult::error(e),
    };
    match ctx.element_details.get(correlation_id) {
        Some(detail) => CallToolResult::json(&detail),
        None => CallToolResult::error(ToolError::not_found(format!(
            "annotation detail '{correlation_id}' not found or expired"
        ))),
    }
}

fn draw_history(ctx: &AppContext) -> CallToolResult {
    match ctx.sessions.list() {
        Ok(files) => CallToolResult::json(&json!({"sessions": files})),
        Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
    }
}

fn draw_session(ctx: &AppContext, params: &Value) -> CallToolResult {
    let file = match optional_str(params, "file") {
        Some(f) => f,
        None => return CallToolResult::error(ToolError::missing_param("file")),
    };
    match ctx.sessions.read(file) {
        Ok(session) => CallToolResult::json(&session),
        Err(gasoline_store::StoreError::PathNotAllowed(msg)) => {
            CallToolResult::error(ToolError::path_not_allowed(msg))
        }
        Err(e) => CallToolResult::error(ToolError::not_found(e.to_string())),
    }
}

/// Summarizes the stored performance-snapshot buffer: sample count plus
/// min/avg/max for the headline vitals.
fn performance(ctx: &AppContext) -> CallToolResult {
    let snapshots: Vec<_> = ctx
        .buffers
        .performance
        .snapshot(&gasoline_events::EventFilter::default())
        .into_iter()
        .filter_map(|e| match e.payload {
            EventPayload::PerfSnapshot(p) => Some(p),
            _ => None,
        })
        .collect();

    if snapshots.is_empty() {
        return CallToolResult::json(&json!({"sample_count": 0}));
    }

    let lcp: Vec<f64> = snapshots.iter().map(|p| p.timing.largest_contentful_paint).collect();
    let cls: Vec<f64> = snapshots.iter().map(|p| p.cumulative_layout_shift).collect();

    CallToolResult::json(&json!({
        "sample_count": snapshots.len(),
        "largest_contentful_paint": summarize(&lcp),
        "cumulative_layout_shift": summarize(&cls),
    }))
}

fn summarize(values: &[f64]) -> Value {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    json!({"min": min, "max": max, "avg": avg})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::test_context;

    #[tokio::test]
    async fn link_health_returns_queued_without_blocking() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"what": "link_health", "url": "https://example.com"})).await;
        assert!(!result.is_error);
        assert!(result.content[0].text.contains("\"status\":\"queued\""));
    }

    #[tokio::test]
    async fn annotation_detail_missing_correlation_id_is_not_found_or_expired() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"what": "annotation_detail", "correlation_id": "annot_nope"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("not found or expired"));
    }

    #[tokio::test]
    async fn draw_session_rejects_path_traversal() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"what": "draw_session", "file": "../../etc/passwd"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("path_not_allowed"));
    }

    #[tokio::test]
    async fn performance_with_no_snapshots_reports_zero_samples() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"what": "performance"})).await;
        assert!(!result.is_error);
        assert!(result.content[0].text.contains("\"sample_count\":0"));
    }
}
