//! The five-tool MCP surface (§4.9): `observe`, `analyze`, `generate`,
//! `configure`, `interact`. [`dispatch`] is the single entrypoint the
//! transport layer calls into; every result it returns has already been run
//! through the redactor, so callers never need to think about it again.

mod analyze;
mod configure;
mod context;
mod generate;
mod interact;
mod observe;
mod params;
mod schema;

pub use context::AppContext;
pub use context::CONFIGURE_STORE_NS;
pub use context::INTERACT_STATES_NS;
pub use gasoline_protocol::Tool;
pub use schema::list_tools;

use gasoline_protocol::CallToolResult;
use gasoline_protocol::ToolError;
use serde_json::Value;

const KNOWN_TOOLS: &[&str] = &["observe", "analyze", "generate", "configure", "interact"];

/// Routes a `tools/call` to its handler and redacts the outbound payload
/// before returning it. Every tool result — success or error — passes
/// through here, since a redaction bug in one handler must not become a
/// data leak.
pub async fn dispatch(ctx: &AppContext, name: &str, arguments: Option<Value>) -> CallToolResult {
    let params = arguments.unwrap_or(Value::Object(Default::default()));

    let result = match name {
        "observe" => observe::handle(ctx, params).await,
        "analyze" => analyze::handle(ctx, params).await,
        "generate" => generate::handle(ctx, params).await,
        "configure" => configure::handle(ctx, params).await,
        "interact" => interact::handle(ctx, params).await,
        other => CallToolResult::error(ToolError::new(
            "unknown_tool",
            format!("unknown tool '{other}', known tools: {}", KNOWN_TOOLS.join(", ")),
        )),
    };

    redact_result(ctx, result)
}

fn redact_result(ctx: &AppContext, result: CallToolResult) -> CallToolResult {
    let bytes = match serde_json::to_vec(&result) {
        Ok(b) => b,
        Err(_) => return result,
    };
    let redacted = ctx.redactor.redact_json(&bytes);
    serde_json::from_slice(&redacted).unwrap_or(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_tool_name_is_reported_as_a_tool_error() {
        let ctx = context::tests::test_context();
        let result = dispatch(&ctx, "bogus", None).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("unknown_tool"));
    }

    #[tokio::test]
    async fn configure_health_round_trips_through_redaction() {
        let ctx = context::tests::test_context();
        let params = serde_json::json!({"action": "health"});
        let result = dispatch(&ctx, "configure", Some(params)).await;
        assert!(!result.is_error);
        assert!(result.content[0].text.contains("\"status\":\"ok\""));
    }
}
