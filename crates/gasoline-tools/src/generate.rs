//! `generate {format, …}` (§4.9). Structured formats (SARIF, HAR, CSP, SRI)
//! must carry their spec's mandatory top-level fields even though this core
//! does not own their full templating (§1, out of scope).

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use gasoline_events::ActionKind;
use gasoline_events::EventFilter;
use gasoline_events::EventPayload;
use gasoline_protocol::CallToolResult;
use gasoline_protocol::ToolError;
use serde_json::Value;
use serde_json::json;
use sha2::Digest;
use sha2::Sha384;

use crate::context::AppContext;
use crate::params::require_str;

const VALID_FORMATS: &[&str] = &[
    "reproduction",
    "test",
    "pr_summary",
    "sarif",
    "har",
    "csp",
    "sri",
    "visual_test",
    "annotation_report",
    "annotation_issues",
];

pub async fn handle(ctx: &AppContext, params: Value) -> CallToolResult {
    let format = match require_str(&params, "format") {
        Ok(f) => f,
        Err(e) => return CallToolResult::error(e),
    };

    if !VALID_FORMATS.contains(&format) {
        return CallToolResult::error(ToolError::unknown_mode(format, VALID_FORMATS));
    }

    match format {
        "reproduction" => reproduction(ctx),
        "test" => playwright_test(ctx),
        "pr_summary" => pr_summary(ctx),
        "sarif" => sarif(ctx),
        "har" => har(ctx),
        "csp" => csp(ctx),
        "sri" => sri(ctx),
        "visual_test" => visual_test(ctx),
        "annotation_report" => annotation_report(ctx),
        "annotation_issues" => annotation_issues(ctx),
        _ => unreachable!("validated above"),
    }
}

fn actions(ctx: &AppContext) -> Vec<gasoline_events::Action> {
    ctx.buffers
        .actions
        .snapshot(&EventFilter::default())
        .into_iter()
        .filter_map(|e| match e.payload {
            EventPayload::Action(a) => Some(a),
            _ => None,
        })
        .collect()
}

fn step_description(a: &gasoline_events::Action) -> String {
    let target = a
        .selectors
        .css
        .clone()
        .or_else(|| a.selectors.text.clone())
        .or_else(|| a.selectors.testid.clone())
        .unwrap_or_else(|| "<element>".to_string());
    match a.kind {
        ActionKind::Click => format!("Click {target}"),
        ActionKind::Input => format!("Type {:?} into {target}", a.value.clone().unwrap_or_default()),
        ActionKind::Select => format!("Select {:?} in {target}", a.value.clone().unwrap_or_default()),
        ActionKind::Keypress => format!("Press key {:?} on {target}", a.value.clone().unwrap_or_default()),
        ActionKind::Navigate => format!("Navigate to {}", a.to_url.clone().unwrap_or_default()),
        ActionKind::Scroll => format!("Scroll {target}"),
    }
}

fn reproduction(ctx: &AppContext) -> CallToolResult {
    let recorded = actions(ctx);
    if recorded.is_empty() {
        return CallToolResult::text("No recorded actions to reproduce.");
    }
    let mut lines = vec!["Steps to reproduce:".to_string()];
    for (i, a) in recorded.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, step_description(a)));
    }
    CallToolResult::text(lines.join("\n"))
}

fn playwright_test(ctx: &AppContext) -> CallToolResult {
    let recorded = actions(ctx);
    let mut body = String::from("test('recorded session', async ({ page }) => {\n");
    for a in &recorded {
        let line = match a.kind {
            ActionKind::Click => format!(
                "  await page.click({:?});\n",
                a.selectors.css.clone().unwrap_or_default()
            ),
            ActionKind::Input => format!(
                "  await page.fill({:?}, {:?});\n",
                a.selectors.css.clone().unwrap_or_default(),
                a.value.clone().unwrap_or_default()
            ),
            ActionKind::Navigate => {
                format!("  await page.goto({:?});\n", a.to_url.clone().unwrap_or_default())
            }
            _ => format!("  // {}\n", step_description(a)),
        };
        body.push_str(&line);
    }
    body.push_str("});\n");
    CallToolResult::text(body)
}

fn pr_summary(ctx: &AppContext) -> CallToolResult {
    let errors = ctx
        .buffers
        .console_logs
        .snapshot(&EventFilter {
            min_level: Some(gasoline_events::ConsoleLevel::Error),
            ..Default::default()
        })
        .len();
    let action_count = actions(ctx).len();
    CallToolResult::text(format!(
        "## Session summary\n\n- {action_count} recorded user action(s)\n- {errors} console error(s) observed\n"
    ))
}

/// SARIF 2.1.0 envelope; console errors become results under a single run.
fn sarif(ctx: &AppContext) -> CallToolResult {
    let errors = ctx.buffers.console_logs.snapshot(&EventFilter {
        min_level: Some(gasoline_events::ConsoleLevel::Error),
        ..Default::default()
    });
    let results: Vec<Value> = errors
        .into_iter()
        .filter_map(|e| match e.payload {
            EventPayload::ConsoleLog(log) => Some(json!({
                "ruleId": "console-error",
                "level": "error",
                "message": {"text": log.message},
                "locations": [],
            })),
            _ => None,
        })
        .collect();

    CallToolResult::json(&json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {"driver": {"name": "gasoline", "informationUri": "https://github.com/gasoline-dev/gasoline", "version": ctx.version}},
            "results": results,
        }],
    }))
}

/// HAR 1.2 envelope built from the network-waterfall buffer.
fn har(ctx: &AppContext) -> CallToolResult {
    let entries = ctx.buffers.network_waterfall.snapshot(&EventFilter::default());
    let har_entries: Vec<Value> = entries
        .into_iter()
        .filter_map(|e| match e.payload {
            EventPayload::NetworkWaterfallEntry(w) => Some(json!({
                "startedDateTime": chrono::DateTime::<chrono::Utc>::from_timestamp_millis(e.timestamp)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                "time": w.duration_ms,
                "request": {"method": "GET", "url": w.url, "httpVersion": "HTTP/1.1", "headers": [], "queryString": [], "headersSize": -1, "bodySize": -1},
                "response": {"status": 200, "statusText": "", "httpVersion": "HTTP/1.1", "headers": [], "content": {"size": w.decoded_body_size, "mimeType": ""}, "redirectURL": "", "headersSize": -1, "bodySize": w.encoded_body_size},
                "cache": {},
                "timings": {"send": 0, "wait": w.duration_ms, "receive": 0},
            })),
            _ => None,
        })
        .collect();

    CallToolResult::json(&json!({
        "log": {
            "version": "1.2",
            "creator": {"name": "gasoline", "version": ctx.version},
            "entries": har_entries,
        }
    }))
}

/// Proposes a restrictive CSP built from the distinct origins observed in
/// the network-waterfall buffer.
fn csp(ctx: &AppContext) -> CallToolResult {
    let entries = ctx.buffers.network_waterfall.snapshot(&EventFilter::default());
    let mut origins: BTreeSet<String> = BTreeSet::new();
    for e in entries {
        if let EventPayload::NetworkWaterfallEntry(w) = e.payload
            && let Some(origin) = origin_of(&w.url)
        {
            origins.insert(origin);
        }
    }
    let sources = origins.into_iter().collect::<Vec<_>>();
    let default_src = if sources.is_empty() {
        "'self'".to_string()
    } else {
        format!("'self' {}", sources.join(" "))
    };
    let policy = format!("default-src {default_src}; object-src 'none'; base-uri 'self'");
    CallToolResult::json(&json!({
        "policy": policy,
        "directives": {"default-src": default_src, "object-src": "'none'", "base-uri": "'self'"},
    }))
}

fn origin_of(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://")?.1;
    let host = without_scheme.split('/').next()?;
    Some(format!("https://{host}"))
}

/// Subresource-integrity hashes for response bodies captured in the
/// network-bodies buffer that look like script/style payloads.
fn sri(ctx: &AppContext) -> CallToolResult {
    let bodies = ctx.buffers.network_bodies.snapshot(&EventFilter::default());
    let resources: Vec<Value> = bodies
        .into_iter()
        .filter_map(|e| match e.payload {
            EventPayload::NetworkBody(b) => {
                let is_asset = b
                    .content_type
                    .as_deref()
                    .is_some_and(|ct| ct.contains("javascript") || ct.contains("css"));
                if !is_asset {
                    return None;
                }
                let body = b.response_body.as_deref().unwrap_or("");
                let digest = Sha384::digest(body.as_bytes());
                let integrity = format!("sha384-{}", BASE64.encode(digest));
                Some(json!({"url": b.url, "integrity": integrity}))
            }
            _ => None,
        })
        .collect();
    CallToolResult::json(&json!({"resources": resources}))
}

fn visual_test(ctx: &AppContext) -> CallToolResult {
    let files = ctx.sessions.list().unwrap_or_default();
    if files.is_empty() {
        return CallToolResult::text("No draw-mode sessions recorded; nothing to build a visual test from.");
    }
    CallToolResult::text(format!(
        "Visual regression test scaffold covering {} stored session(s): {}",
        files.len(),
        files.join(", ")
    ))
}

fn annotation_report(ctx: &AppContext) -> CallToolResult {
    let files = ctx.sessions.list().unwrap_or_default();
    let mut total = 0usize;
    let mut lines = vec!["# Annotation report".to_string()];
    for file in &files {
        if let Ok(session) = ctx.sessions.read(file) {
            total += session.annotations.len();
            lines.push(format!("- {}: {} annotation(s)", file, session.annotations.len()));
        }
    }
    lines.insert(1, format!("Total annotations: {total}\n"));
    CallToolResult::text(lines.join("\n"))
}

fn annotation_issues(ctx: &AppContext) -> CallToolResult {
    let files = ctx.sessions.list().unwrap_or_default();
    let mut issues = Vec::new();
    for file in &files {
        if let Ok(session) = ctx.sessions.read(file) {
            for annotation in session.annotations {
                if let Some(text) = annotation.get("text").and_then(Value::as_str) {
                    issues.push(json!({"title": text, "source_session": file}));
                }
            }
        }
    }
    CallToolResult::json(&json!({"issues": issues, "count": issues.len()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::test_context;

    #[tokio::test]
    async fn unknown_format_lists_valid_values() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"format": "nonsense"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("unknown_mode"));
    }

    #[tokio::test]
    async fn sarif_carries_its_mandatory_top_level_fields() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"format": "sarif"})).await;
        assert!(!result.is_error);
        let parsed: Value = serde_json::from_str(&result.content[0].text).unwrap();
        assert_eq!(parsed["version"], "2.1.0");
        assert!(parsed["runs"].is_array());
    }

    #[tokio::test]
    async fn har_carries_its_mandatory_top_level_fields() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"format": "har"})).await;
        assert!(!result.is_error);
        let parsed: Value = serde_json::from_str(&result.content[0].text).unwrap();
        assert_eq!(parsed["log"]["version"], "1.2");
        assert!(parsed["log"]["entries"].is_array());
    }

    #[tokio::test]
    async fn reproduction_with_no_recorded_actions_says_so() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"format": "reproduction"})).await;
        assert!(!result.is_error);
        assert!(result.content[0].text.contains("No recorded actions"));
    }
}
