//! JSON Schema generation for `tools/list` (§4.8). Every enum value a
//! handler accepts must show up here — a mode missing from the schema is a
//! mode the calling AI can never discover.

use std::collections::BTreeMap;

use gasoline_protocol::Tool;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde::Deserialize;
use serde_json::Value;

fn schema_for<T: JsonSchema>() -> Value {
    let schema = SchemaSettings::draft2019_09()
        .with(|s| {
            s.inline_subschemas = true;
            s.option_add_null_type = false;
        })
        .into_generator()
        .into_root_schema_for::<T>();
    serde_json::to_value(&schema).expect("tool schema should serialize to JSON")
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum ObserveMode {
    Page,
    Tabs,
    Logs,
    Errors,
    NetworkWaterfall,
    Vitals,
    Actions,
    WebsocketEvents,
    WebsocketStatus,
    ExtensionLogs,
    Pilot,
    Performance,
    Timeline,
    ErrorClusters,
    History,
    Accessibility,
    SecurityAudit,
    ThirdPartyAudit,
    PendingCommands,
    FailedCommands,
    NetworkBodies,
    Recordings,
    CommandResult,
    SavedVideos,
    ErrorBundles,
    Screenshot,
}

/// Watches a live browser signal or replays a buffered one. Buffered modes
/// return immediately; live modes block until the extension reports back or
/// the pending-query TTL elapses.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct ObserveParams {
    mode: ObserveMode,
    /// Minimum console level to include (buffered console modes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_level: Option<String>,
    /// Caps the number of returned entries; clamped to the buffer's capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    /// Case-sensitive substring filter applied to each entry's searchable text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_substr: Option<String>,
    /// Only include entries recorded at or after this unix-millis timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    since_ts: Option<i64>,
    /// Required for `command_result`: the correlation id to look up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum AnalyzeMode {
    LinkHealth,
    Annotations,
    AnnotationDetail,
    DrawHistory,
    DrawSession,
    Performance,
}

/// Derives a judgment from recorded signal rather than replaying it raw.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct AnalyzeParams {
    what: AnalyzeMode,
    /// Required for `annotation_detail`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    /// Required for `draw_session`: the session filename from `draw_history`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum GenerateFormat {
    Reproduction,
    Test,
    PrSummary,
    Sarif,
    Har,
    Csp,
    Sri,
    VisualTest,
    AnnotationReport,
    AnnotationIssues,
}

/// Renders recorded session data into a deliverable artifact.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct GenerateParams {
    format: GenerateFormat,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum ConfigureAction {
    Health,
    Clear,
    Store,
    Save,
    Load,
    List,
    NoiseRule,
    AuditLog,
    Streaming,
    TestBoundaryStart,
    TestBoundaryEnd,
    QueryDom,
}

/// Daemon maintenance, namespaced key/value persistence, and noise-rule
/// management.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct ConfigureParams {
    action: ConfigureAction,
    /// Which ring buffer to clear; omit to clear all (`clear` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    buffer: Option<String>,
    /// Key to read or write (`store`/`save`/`load`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    /// Value to persist (`store`/`save`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    /// Sub-action for `noise_rule`: add, list, remove, reset, auto_detect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    noise_action: Option<String>,
    /// Sub-action for `streaming`: enable, disable, status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stream_action: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum InteractAction {
    ListStates,
    SaveState,
    LoadState,
    DeleteState,
    Navigate,
    ExecuteJs,
    Click,
    Type,
    Select,
    Check,
    Focus,
    ScrollTo,
    WaitFor,
    KeyPress,
    Highlight,
    GetText,
    GetValue,
    GetAttribute,
    SetAttribute,
    ListInteractive,
    DrawModeStart,
    Upload,
    RecordStart,
    RecordStop,
    Subtitle,
}

/// Drives the page or manages saved interaction-state snapshots. Every
/// action but the state-CRUD quartet and `subtitle` requires pilot to be
/// enabled in the extension.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct InteractParams {
    action: InteractAction,
    /// Name of a saved state (`save_state`/`load_state`/`delete_state`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Opaque state payload to persist (`save_state`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

pub fn list_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "observe".to_string(),
            description: "Reads a live or buffered browser signal (console logs, network, \
                performance, pilot state, accessibility/security audits, recordings, and more)."
                .to_string(),
            input_schema: schema_for::<ObserveParams>(),
        },
        Tool {
            name: "analyze".to_string(),
            description: "Derives a judgment from recorded browser signal: link health, \
                annotations, draw-mode sessions, performance trends."
                .to_string(),
            input_schema: schema_for::<AnalyzeParams>(),
        },
        Tool {
            name: "generate".to_string(),
            description: "Renders recorded session data into a deliverable artifact: \
                reproduction steps, a Playwright test, a PR summary, or a structured report \
                (SARIF, HAR, CSP, SRI)."
                .to_string(),
            input_schema: schema_for::<GenerateParams>(),
        },
        Tool {
            name: "configure".to_string(),
            description: "Daemon health and maintenance, namespaced key/value persistence, and \
                noise-rule management."
                .to_string(),
            input_schema: schema_for::<ConfigureParams>(),
        },
        Tool {
            name: "interact".to_string(),
            description: "Drives the page under pilot (navigate, click, type, and friends) or \
                manages saved interaction-state snapshots."
                .to_string(),
            input_schema: schema_for::<InteractParams>(),
        },
    ]
}
