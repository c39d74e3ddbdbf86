//! `interact {action, …}` (§4.9). The state-CRUD quartet and `subtitle` run
//! locally or pilot-free; every other action rides the pilot-gated command
//! queue (C5) and blocks on the extension's eventual report.

use gasoline_pending::CommandRequest;
use gasoline_pending::EnqueueError;
use gasoline_pending::WaitResult;
use gasoline_pending::wait;
use gasoline_protocol::CallToolResult;
use gasoline_protocol::ToolError;
use serde_json::Value;
use serde_json::json;

use crate::context::AppContext;
use crate::context::INTERACT_STATES_NS;
use crate::params::require_str;

const VALID_ACTIONS: &[&str] = &[
    "list_states",
    "save_state",
    "load_state",
    "delete_state",
    "navigate",
    "execute_js",
    "click",
    "type",
    "select",
    "check",
    "focus",
    "scroll_to",
    "wait_for",
    "key_press",
    "highlight",
    "get_text",
    "get_value",
    "get_attribute",
    "set_attribute",
    "list_interactive",
    "draw_mode_start",
    "upload",
    "record_start",
    "record_stop",
    "subtitle",
];

/// Actions that never require pilot to be enabled: the state-CRUD quartet
/// plus `subtitle`, which only overlays caption text and touches nothing
/// the page can act on.
const PILOT_EXEMPT: &[&str] = &["list_states", "save_state", "load_state", "delete_state", "subtitle"];

pub async fn handle(ctx: &AppContext, params: Value) -> CallToolResult {
    let action = match require_str(&params, "action") {
        Ok(a) => a,
        Err(e) => return CallToolResult::error(e),
    };

    if !VALID_ACTIONS.contains(&action) {
        return CallToolResult::error(ToolError::unknown_mode(action, VALID_ACTIONS));
    }

    match action {
        "list_states" => list_states(ctx),
        "save_state" => save_state(ctx, &params),
        "load_state" => load_state(ctx, &params),
        "delete_state" => delete_state(ctx, &params),
        other => dispatch_command(ctx, other, params).await,
    }
}

fn list_states(ctx: &AppContext) -> CallToolResult {
    CallToolResult::json(&json!({"states": ctx.kv.list(INTERACT_STATES_NS)}))
}

fn save_state(ctx: &AppContext, params: &Value) -> CallToolResult {
    let name = match require_str(params, "name") {
        Ok(n) => n,
        Err(e) => return CallToolResult::error(e),
    };
    let state = params.get("state").cloned().unwrap_or(Value::Null);
    match ctx.kv.store(INTERACT_STATES_NS, name, state) {
        Ok(()) => CallToolResult::json(&json!({"saved": name})),
        Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
    }
}

fn load_state(ctx: &AppContext, params: &Value) -> CallToolResult {
    let name = match require_str(params, "name") {
        Ok(n) => n,
        Err(e) => return CallToolResult::error(e),
    };
    match ctx.kv.load(INTERACT_STATES_NS, name) {
        Some(state) => CallToolResult::json(&json!({"name": name, "state": state})),
        None => CallToolResult::error(ToolError::not_found(format!("no saved state named '{name}'"))),
    }
}

fn delete_state(ctx: &AppContext, params: &Value) -> CallToolResult {
    let name = match require_str(params, "name") {
        Ok(n) => n,
        Err(e) => return CallToolResult::error(e),
    };
    match ctx.kv.delete(INTERACT_STATES_NS, name) {
        Ok(true) => CallToolResult::json(&json!({"deleted": name})),
        Ok(false) => CallToolResult::error(ToolError::not_found(format!("no saved state named '{name}'"))),
        Err(e) => CallToolResult::error(ToolError::internal(e.to_string())),
    }
}

/// Every remaining action is an outbound browser command: build the
/// `params` bag from everything but `action` itself, enqueue (subject to
/// pilot gating), and block for the extension's report.
async fn dispatch_command(ctx: &AppContext, action: &str, mut params: Value) -> CallToolResult {
    if let Some(obj) = params.as_object_mut() {
        obj.remove("action");
    }
    let pilot_required = !PILOT_EXEMPT.contains(&action);

    let command = CommandRequest {
        action: action.to_string(),
        params,
        pilot_required,
    };

    match ctx.commands.enqueue(command) {
        Err(EnqueueError::PilotDisabled) => CallToolResult::error(ToolError::pilot_disabled()),
        Ok((_correlation_id, rx)) => match wait(rx, ctx.pending_ttl).await {
            WaitResult::Completed(v) => CallToolResult::json(&v),
            WaitResult::Failed(e) => CallToolResult::error(ToolError::internal(e)),
            WaitResult::TimedOut => CallToolResult::error(ToolError::bridge_timeout()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::test_context;

    #[tokio::test]
    async fn navigate_with_pilot_off_is_pilot_disabled() {
        let ctx = test_context();
        let result = handle(&ctx, json!({"action": "navigate", "url": "https://example.com"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("pilot_disabled"));
    }

    #[tokio::test]
    async fn state_crud_quartet_never_requires_pilot() {
        let ctx = test_context();
        let saved = handle(&ctx, json!({"action": "save_state", "name": "s1", "state": {"x": 1}})).await;
        assert!(!saved.is_error);

        let loaded = handle(&ctx, json!({"action": "load_state", "name": "s1"})).await;
        assert!(!loaded.is_error);
        assert!(loaded.content[0].text.contains("\"x\":1"));

        let deleted = handle(&ctx, json!({"action": "delete_state", "name": "s1"})).await;
        assert!(!deleted.is_error);

        let missing = handle(&ctx, json!({"action": "load_state", "name": "s1"})).await;
        assert!(missing.is_error);
        assert!(missing.content[0].text.contains("not_found"));
    }

    #[tokio::test]
    async fn subtitle_is_pilot_exempt_but_still_parks_a_command() {
        let mut ctx = test_context();
        ctx.pending_ttl = std::time::Duration::from_millis(20);
        let result = handle(&ctx, json!({"action": "subtitle", "text": "hello"})).await;
        // Pilot-exempt means it enqueues rather than failing pilot_disabled;
        // with no extension attached it still times out waiting for a report.
        assert!(result.is_error);
        assert!(result.content[0].text.contains("bridge_timeout"));
    }
}
