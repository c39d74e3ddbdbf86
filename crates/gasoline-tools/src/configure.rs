//! `configure {action, …}` (§4.9). The grab-bag tool: daemon health/buffer
//! maintenance, namespaced key/value persistence, noise-rule management,
//! and a handful of test-harness conveniences.

use gasoline_noise::NewRuleSpec;
use gasoline_pending::WaitResult;
use gasoline_pending::wait;
use gasoline_protocol::CallToolResult;
use gasoline_protocol::ToolError;
use serde_json::Value;
use serde_json::json;

use crate::context::AppContext;
use crate::context::CONFIGURE_STORE_NS;
use crate::params::optional_str;
use crate::params::require_str;

const VALID_ACTIONS: &[&str] = &[
    "health",
    "clear",
    "store",
    "save",
    "load",
    "list",
    "noise_rule",
    "audit_log",
    "streaming",
    "test_boundary_start",
    "test_boundary_end",
    "query_dom",
];

pub async fn handle(ctx: &AppContext, params: Value) -> CallToolResult {
    let action = match require_str(&params, "action") {
        Ok(a) => a,
        Err(e) => return CallToolResult::error(e),
    };

    if !VALID_ACTIONS.contains(&action) {
        return CallToolResult::error(ToolError::unknown_mode(action, VALID_ACTIONS));
    }

    match action {
        "health" => health(ctx),
        "clear" => clear(ctx, &params),
        "store" | "save" => store(ctx, &params),
        "load" => load(ctx, &params),
        "list" => list(ctx),
        "noise_rule" => noise_rule(ctx, &params),
        "audit_log" => audit_log(ctx),
        "streaming" => streaming(ctx, &params),
        "test_boundary_start" => test_boundary(ctx, "test_boundary_start"),
        "test_boundary_end" => test_boundary(ctx, "test_boundary_end"),
        "query_dom" => query_dom(ctx, &params).await,
        _ => unreachable!("validated above"),
    }
}

fn health(ctx: &AppContext) -> CallToolResult {
    let state = ctx.extension_state.get();
    let uptime_seconds = (chrono::Utc::now() - ctx.started_at).num_seconds().max(0);
    CallToolResult::json(&json!({
        "status": "ok",
        "version": ctx.version,
        "uptime_seconds": uptime_seconds,
        "extension_connected": state.initialized,
        "capture": {
            "pilot_enabled": state.pilot_enabled,
            "tracking_enabled": state.tracking_enabled,
        },
        "buffers": {
            "console_logs": ctx.buffers.console_logs.len(),
            "network_waterfall": ctx.buffers.network_waterfall.len(),
            "network_bodies": ctx.buffers.network_bodies.len(),
            "websocket_events": ctx.buffers.websocket_events.len(),
            "actions": ctx.buffers.actions.len(),
            "performance": ctx.buffers.performance.len(),
            "extension_logs": ctx.buffers.extension_logs.len(),
        },
    }))
}

fn clear(ctx: &AppContext, params: &Value) -> CallToolResult {
    match optional_str(params, "buffer") {
        Some(name) => {
            if ctx.buffers.clear_named(name) {
                CallToolResult::json(&json!({"cleared": name}))
            } else {
                CallToolResult::error(ToolError::invalid_param(format!("unknown buffer '{name}'")))
            }
        }
        None => {
            ctx.buffers.clear_all();
            CallToolResult::json(&json!({"cleared": "all"}))
        }
    }
}

fn store(ctx: &AppContext, params: &Value) -> CallToolResult {
    let key = match require_str(params, "key") {
        Ok(k) => k,
        Err(e) => return CallToolResult::error(e),
    };
    let Some(value) = params.get("value") else {
        return CallToolResult::error(ToolError::missing_param("value"));
    };
    match ctx.kv.store(CONFIGURE_STORE_NS, key, value.clone()) {
        Ok(()) => CallToolResult::json(&json!({"stored": key})),
        Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
    }
}

fn load(ctx: &AppContext, params: &Value) -> CallToolResult {
    let key = match require_str(params, "key") {
        Ok(k) => k,
        Err(e) => return CallToolResult::error(e),
    };
    match ctx.kv.load(CONFIGURE_STORE_NS, key) {
        Some(value) => CallToolResult::json(&json!({"key": key, "value": value})),
        None => CallToolResult::error(ToolError::not_found(format!("no stored value for key '{key}'"))),
    }
}

fn list(ctx: &AppContext) -> CallToolResult {
    let keys = ctx.kv.list(CONFIGURE_STORE_NS);
    CallToolResult::json(&json!({"keys": keys}))
}

fn noise_rule(ctx: &AppContext, params: &Value) -> CallToolResult {
    let noise_action = match require_str(params, "noise_action") {
        Ok(a) => a,
        Err(e) => return CallToolResult::error(e),
    };

    match noise_action {
        "list" => CallToolResult::json(&json!({"rules": ctx.noise.list()})),
        "add" => {
            let Some(rules) = params.get("rules").and_then(Value::as_array) else {
                return CallToolResult::error(ToolError::missing_param("rules"));
            };
            let mut specs = Vec::with_capacity(rules.len());
            for rule in rules {
                match parse_new_rule(rule) {
                    Ok(spec) => specs.push(spec),
                    Err(e) => return CallToolResult::error(e),
                }
            }
            match ctx.noise.add(specs) {
                Ok(added) => CallToolResult::json(&json!({"added": added})),
                Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
            }
        }
        "remove" => {
            let id = match require_str(params, "id") {
                Ok(id) => id,
                Err(e) => return CallToolResult::error(e),
            };
            match ctx.noise.remove(id) {
                Ok(removed) => CallToolResult::json(&json!({"removed": removed})),
                Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
            }
        }
        "reset" => match ctx.noise.reset() {
            Ok(()) => CallToolResult::json(&json!({"reset": true})),
            Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
        },
        "auto_detect" => auto_detect(ctx, params),
        other => CallToolResult::error(ToolError::unknown_mode(
            other,
            &["add", "list", "remove", "reset", "auto_detect"],
        )),
    }
}

fn parse_new_rule(value: &Value) -> Result<NewRuleSpec, ToolError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ToolError::invalid_param(format!("malformed noise rule: {e}")))
}

/// Analyzes console/network buffer statistics for repeat offenders and
/// proposes (or, with `apply: true`, immediately applies) noise rules.
fn auto_detect(ctx: &AppContext, params: &Value) -> CallToolResult {
    let console_observations = ctx
        .buffers
        .console_logs
        .snapshot(&gasoline_events::EventFilter::default())
        .into_iter()
        .filter_map(|e| match e.payload {
            gasoline_events::EventPayload::ConsoleLog(log) => Some(gasoline_noise::Observation {
                category: gasoline_noise::NoiseCategory::Console,
                key: log.message,
            }),
            _ => None,
        });
    let network_observations = ctx
        .buffers
        .network_waterfall
        .snapshot(&gasoline_events::EventFilter::default())
        .into_iter()
        .filter_map(|e| match e.payload {
            gasoline_events::EventPayload::NetworkWaterfallEntry(entry) => Some(gasoline_noise::Observation {
                category: gasoline_noise::NoiseCategory::Network,
                key: entry.url,
            }),
            _ => None,
        });
    let observations: Vec<gasoline_noise::Observation> =
        console_observations.chain(network_observations).collect();

    let detect_params = gasoline_noise::AutoDetectParams {
        confidence_threshold: params
            .get("confidence_threshold")
            .and_then(Value::as_f64)
            .unwrap_or(0.1),
        apply: params.get("apply").and_then(Value::as_bool).unwrap_or(false),
    };
    let proposals = gasoline_noise::propose(&observations, &detect_params);

    if detect_params.apply && !proposals.is_empty() {
        let specs = proposals.iter().map(gasoline_noise::proposal_to_rule_spec).collect();
        return match ctx.noise.add(specs) {
            Ok(added) => CallToolResult::json(&json!({"applied": added})),
            Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
        };
    }
    CallToolResult::json(&json!({"proposals": proposals}))
}

/// A lightweight audit trail: recorded user actions interleaved with
/// command completions/failures, the closest this core gets to a compliance
/// log without a dedicated event kind.
fn audit_log(ctx: &AppContext) -> CallToolResult {
    let actions = ctx.buffers.actions.snapshot(&gasoline_events::EventFilter::default());
    let completed = ctx.commands.completed();
    let failed = ctx.commands.failed();
    CallToolResult::json(&json!({
        "actions": actions,
        "commands_completed": completed,
        "commands_failed": failed,
    }))
}

fn streaming(ctx: &AppContext, params: &Value) -> CallToolResult {
    let stream_action = match require_str(params, "stream_action") {
        Ok(a) => a,
        Err(e) => return CallToolResult::error(e),
    };
    const KEY: &str = "streaming_enabled";
    match stream_action {
        "enable" => match ctx.kv.store(CONFIGURE_STORE_NS, KEY, Value::Bool(true)) {
            Ok(()) => CallToolResult::json(&json!({"streaming": "enabled"})),
            Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
        },
        "disable" => match ctx.kv.store(CONFIGURE_STORE_NS, KEY, Value::Bool(false)) {
            Ok(()) => CallToolResult::json(&json!({"streaming": "disabled"})),
            Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
        },
        "status" => {
            let enabled = ctx
                .kv
                .load(CONFIGURE_STORE_NS, KEY)
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            CallToolResult::json(&json!({"streaming_enabled": enabled}))
        }
        other => CallToolResult::error(ToolError::unknown_mode(other, &["enable", "disable", "status"])),
    }
}

fn test_boundary(ctx: &AppContext, key: &str) -> CallToolResult {
    let now = chrono::Utc::now();
    match ctx.kv.store(CONFIGURE_STORE_NS, key, json!(now.to_rfc3339())) {
        Ok(()) => CallToolResult::json(&json!({key: now.to_rfc3339()})),
        Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
    }
}

async fn query_dom(ctx: &AppContext, params: &Value) -> CallToolResult {
    let (_correlation_id, rx) = ctx.registry.create("query_dom", params.clone(), ctx.pending_ttl);
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
    async fn unknown_action_lists_valid_values() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"action": "nonsense"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("unknown_mode"));
    }

    #[tokio::test]
    async fn health_reports_pilot_disabled_before_first_sync() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"action": "health"})).await;
        assert!(!result.is_error);
        assert!(result.content[0].text.contains("\"pilot_enabled\":false"));
        assert!(result.content[0].text.contains("\"extension_connected\":false"));
    }

    #[tokio::test]
    async fn store_then_load_round_trips_through_the_kv_namespace() {
        let ctx = test_context();
        let stored = handle(&ctx, json!({"action": "store", "key": "k", "value": {"a": 1}})).await;
        assert!(!stored.is_error);

        let loaded = handle(&ctx, json!({"action": "load", "key": "k"})).await;
        assert!(!loaded.is_error);
        assert!(loaded.content[0].text.contains("\"a\":1"));

        let listed = handle(&ctx, json!({"action": "list"})).await;
        assert!(listed.content[0].text.contains('k'));
    }

    #[tokio::test]
    async fn load_missing_key_is_not_found() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"action": "load", "key": "absent"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("not_found"));
    }

    #[tokio::test]
    async fn noise_rule_add_assigns_sequential_user_ids() {
        let ctx = test_context();
        let rule = json!({
            "category": "network",
            "match_spec": {"url_regex": "example\\.com"},
            "classification": "infrastructure",
        });

        let first = handle(&ctx, json!({"action": "noise_rule", "noise_action": "add", "rules": [rule.clone()]})).await;
        assert!(!first.is_error, "{}", first.content[0].text);
        assert!(first.content[0].text.contains("user_1"));

        let second = handle(&ctx, json!({"action": "noise_rule", "noise_action": "add", "rules": [rule]})).await;
        assert!(second.content[0].text.contains("user_2"));
    }
}
