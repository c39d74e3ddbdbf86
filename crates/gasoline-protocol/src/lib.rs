//! Wire types for the JSON-RPC 2.0 surface the daemon speaks to AI clients,
//! both over stdio and over `POST /mcp`. Mirrors the shape of the Model
//! Context Protocol closely enough that generic MCP clients can talk to it
//! without a bridge-specific adapter.

use std::fmt;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes plus the reserved application range we use
/// for our own taxonomy when a tool handler wants to short-circuit dispatch.
pub const PARSE_ERROR_CODE: i64 = -32700;
pub const INVALID_REQUEST_ERROR_CODE: i64 = -32600;
pub const METHOD_NOT_FOUND_ERROR_CODE: i64 = -32601;
pub const INVALID_PARAMS_ERROR_CODE: i64 = -32602;
pub const INTERNAL_ERROR_CODE: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Integer(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Integer(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCError {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JSONRPCErrorError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCErrorError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A single line on the stdio transport, or the single object accepted by
/// `POST /mcp`. Untagged so callers can't distinguish member order; the
/// variant is picked by which required fields are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JSONRPCMessage {
    Request(JSONRPCRequest),
    Notification(JSONRPCNotification),
    Response(JSONRPCResponse),
    Error(JSONRPCError),
}

/// Requests the dispatcher actually understands. `TryFrom<JSONRPCRequest>`
/// is where an unknown method turns into `-32601` before any tool code runs.
pub enum ClientRequest {
    Initialize(InitializeRequestParams),
    ListTools,
    CallTool(CallToolRequestParams),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InitializeRequestParams {
    #[serde(default, rename = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Option<Value>,
    #[serde(default, rename = "clientInfo")]
    pub client_info: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallToolRequestParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl TryFrom<JSONRPCRequest> for ClientRequest {
    type Error = UnknownMethodError;

    fn try_from(req: JSONRPCRequest) -> Result<Self, Self::Error> {
        match req.method.as_str() {
            "initialize" => {
                let params = req
                    .params
                    .map(serde_json::from_value)
                    .transpose()
                    .unwrap_or(None)
                    .unwrap_or_default();
                Ok(ClientRequest::Initialize(params))
            }
            "tools/list" => Ok(ClientRequest::ListTools),
            "tools/call" => {
                let params: CallToolRequestParams = req
                    .params
                    .ok_or_else(|| UnknownMethodError::InvalidParams("missing params".into()))
                    .and_then(|v| {
                        serde_json::from_value(v)
                            .map_err(|e| UnknownMethodError::InvalidParams(e.to_string()))
                    })?;
                Ok(ClientRequest::CallTool(params))
            }
            other => Err(UnknownMethodError::MethodNotFound(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UnknownMethodError {
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
}

impl UnknownMethodError {
    pub fn code(&self) -> i64 {
        match self {
            UnknownMethodError::MethodNotFound(_) => METHOD_NOT_FOUND_ERROR_CODE,
            UnknownMethodError::InvalidParams(_) => INVALID_PARAMS_ERROR_CODE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilitiesTools {}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    pub tools: ServerCapabilitiesTools,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// The mandatory shape of every `tools/call` return, per the tool-result
/// envelope contract: `content` entries are text, `isError` flags failures,
/// `metadata` is opaque passthrough that redaction must not disturb.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CallToolResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".to_string(),
                text: text.into(),
            }],
            is_error: false,
            metadata: None,
        }
    }

    pub fn json(value: &impl Serialize) -> Self {
        match serde_json::to_string(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::error(ToolError::internal(format!("serialize failure: {e}"))),
        }
    }

    pub fn error(err: ToolError) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".to_string(),
                text: format!("Error: {} — {}", err.code, err.message),
            }],
            is_error: true,
            metadata: None,
        }
    }
}

/// Application-level error taxonomy (§7 of the design). These never surface
/// as JSON-RPC protocol errors; they are encoded inside the tool result
/// envelope so a caller always gets a well-formed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub code: &'static str,
    pub message: String,
}

impl ToolError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn missing_param(name: &str) -> Self {
        Self::new("missing_param", format!("missing required parameter: {name}"))
    }

    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::new("invalid_param", message)
    }

    pub fn unknown_mode(what: &str, valid: &[&str]) -> Self {
        Self::new(
            "unknown_mode",
            format!("unknown mode '{what}', valid values: {}", valid.join(", ")),
        )
    }

    pub fn pilot_disabled() -> Self {
        Self::new("pilot_disabled", "pilot is disabled; enable pilot in the extension first")
    }

    pub fn bridge_timeout() -> Self {
        Self::new("bridge_timeout", "pending query exceeded its time-to-live")
    }

    pub fn path_not_allowed(message: impl Into<String>) -> Self {
        Self::new("path_not_allowed", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal", message)
    }

    /// Renders as the structured JSON used for `content[0].text` on error
    /// responses that embed machine-readable detail (e.g. `unknown_mode`'s
    /// valid-values list).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "code": self.code, "message": self.message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_maps_to_method_not_found() {
        let req = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(1),
            method: "bogus/method".to_string(),
            params: None,
        };
        let err = ClientRequest::try_from(req).unwrap_err();
        assert_eq!(err.code(), METHOD_NOT_FOUND_ERROR_CODE);
    }

    #[test]
    fn call_tool_requires_params() {
        let req = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(1),
            method: "tools/call".to_string(),
            params: None,
        };
        let err = ClientRequest::try_from(req).unwrap_err();
        assert_eq!(err.code(), INVALID_PARAMS_ERROR_CODE);
    }

    #[test]
    fn tool_result_error_envelope_is_structured() {
        let result = CallToolResult::error(ToolError::missing_param("url"));
        assert!(result.is_error);
        assert!(result.content[0].text.contains("missing_param"));
    }
}
