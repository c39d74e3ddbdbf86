//! Turns a single `JSONRPCRequest` into its `JSONRPCResponse`/`JSONRPCError`,
//! independent of which transport carried it in (§6: stdio and `POST /mcp`
//! share this exact logic, so behavior cannot drift between the two).

use gasoline_protocol::CallToolRequestParams;
use gasoline_protocol::ClientRequest;
use gasoline_protocol::INVALID_REQUEST_ERROR_CODE;
use gasoline_protocol::InitializeResult;
use gasoline_protocol::JSONRPCError;
use gasoline_protocol::JSONRPCErrorError;
use gasoline_protocol::JSONRPCMessage;
use gasoline_protocol::JSONRPCRequest;
use gasoline_protocol::JSONRPCResponse;
use gasoline_protocol::JSONRPC_VERSION;
use gasoline_protocol::ListToolsResult;
use gasoline_protocol::RequestId;
use gasoline_protocol::ServerCapabilities;
use gasoline_protocol::ServerCapabilitiesTools;
use gasoline_protocol::ServerInfo;
use gasoline_tools::AppContext;

/// Handles one already-deserialized request and produces the message to
/// write back. `initialize` may only run once per connection; the stdio
/// transport owns that state since a fresh HTTP `/mcp` call has no
/// connection to speak of and always treats itself as already-initialized.
pub async fn handle_request(ctx: &AppContext, already_initialized: bool, request: JSONRPCRequest) -> JSONRPCMessage {
    let id = request.id.clone();

    let client_request = match ClientRequest::try_from(request) {
        Ok(r) => r,
        Err(e) => return error_message(id, e.code(), e.to_string()),
    };

    match client_request {
        ClientRequest::Initialize(params) => {
            tracing::info!(?params, "initialize");
            if already_initialized {
                return error_message(id, INVALID_REQUEST_ERROR_CODE, "initialize called more than once".to_string());
            }
            response_message(
                id,
                InitializeResult {
                    server_info: ServerInfo {
                        name: "gasoline".to_string(),
                        version: ctx.version.clone(),
                    },
                    capabilities: ServerCapabilities {
                        tools: ServerCapabilitiesTools {},
                    },
                },
            )
        }
        ClientRequest::ListTools => {
            let result = ListToolsResult {
                tools: gasoline_tools::list_tools(),
            };
            response_message(id, result)
        }
        ClientRequest::CallTool(CallToolRequestParams { name, arguments }) => {
            tracing::info!(tool = %name, "tools/call");
            let result = gasoline_tools::dispatch(ctx, &name, arguments).await;
            response_message(id, result)
        }
    }
}

fn response_message<T: serde::Serialize>(id: RequestId, result: T) -> JSONRPCMessage {
    JSONRPCMessage::Response(JSONRPCResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        result: serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
    })
}

fn error_message(id: RequestId, code: i64, message: String) -> JSONRPCMessage {
    JSONRPCMessage::Error(JSONRPCError {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        error: JSONRPCErrorError { code, message, data: None },
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use gasoline_protocol::InitializeRequestParams;

    use super::*;

    fn test_context() -> AppContext {
        let dir = tempfile::tempdir().unwrap().into_path();
        let registry = Arc::new(gasoline_pending::Registry::new());
        let extension_state = Arc::new(gasoline_pending::ExtensionStateCache::default());
        let pending_ttl = Duration::from_secs(5);
        AppContext {
            buffers: Arc::new(gasoline_events::BufferSet::default()),
            redactor: Arc::new(gasoline_redact::Redactor::default()),
            noise: Arc::new(gasoline_noise::NoiseStore::load(dir.join("noise.json"))),
            commands: Arc::new(gasoline_pending::CommandQueue::new(
                registry.clone(),
                extension_state.clone(),
                pending_ttl,
            )),
            registry,
            extension_state,
            sessions: Arc::new(gasoline_store::SessionStore::new(dir.join("sessions"))),
            element_details: Arc::new(gasoline_store::ElementDetailCache::new(Duration::from_secs(300))),
            kv: Arc::new(gasoline_store::KvStore::new(dir.join("kv"))),
            pending_ttl,
            version: "0.0.0-test".to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn initialize_then_initialize_again_is_rejected() {
        let ctx = test_context();
        let req = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(1),
            method: "initialize".to_string(),
            params: Some(serde_json::to_value(InitializeRequestParams::default()).unwrap()),
        };
        let msg = handle_request(&ctx, true, req).await;
        let JSONRPCMessage::Error(e) = msg else {
            panic!("expected an error message");
        };
        assert_eq!(e.error.code, INVALID_REQUEST_ERROR_CODE);
    }

    #[tokio::test]
    async fn list_tools_returns_all_five() {
        let ctx = test_context();
        let req = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(2),
            method: "tools/list".to_string(),
            params: None,
        };
        let msg = handle_request(&ctx, true, req).await;
        let JSONRPCMessage::Response(r) = msg else {
            panic!("expected a response message");
        };
        let tools = r.result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
    }
}
