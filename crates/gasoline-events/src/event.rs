//! The tagged-union event model ingested from the extension (§3 of the
//! design). Every variant carries the common envelope plus kind-specific
//! fields; all wire field names are snake_case.

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleLog {
    pub level: ConsoleLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkWaterfallEntry {
    pub url: String,
    pub initiator_type: String,
    pub duration_ms: f64,
    pub start_time_ms: f64,
    pub transfer_size: u64,
    pub decoded_body_size: u64,
    pub encoded_body_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkBody {
    pub method: String,
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub request_body: Option<String>,
    #[serde(default)]
    pub response_body: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WSEventKind {
    Open,
    Close,
    Message,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WSEvent {
    pub kind: WSEventKind,
    pub conn_id: String,
    pub url: String,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Input,
    Select,
    Keypress,
    Navigate,
    Scroll,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionSelectors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default)]
    pub selectors: ActionSelectors,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub to_url: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfTiming {
    #[serde(default)]
    pub dom_content_loaded: f64,
    #[serde(default)]
    pub load: f64,
    #[serde(default)]
    pub first_contentful_paint: f64,
    #[serde(default)]
    pub largest_contentful_paint: f64,
    #[serde(default)]
    pub time_to_first_byte: f64,
    #[serde(default)]
    pub dom_interactive: f64,
    #[serde(default)]
    pub interaction_to_next_paint: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfNetwork {
    #[serde(default)]
    pub request_count: u32,
    #[serde(default)]
    pub transfer_size: u64,
    #[serde(default)]
    pub decoded_size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfLongTasks {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub total_blocking_time: f64,
    #[serde(default)]
    pub longest: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserTiming {
    #[serde(default)]
    pub marks: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfSnapshot {
    pub timing: PerfTiming,
    pub network: PerfNetwork,
    pub long_tasks: PerfLongTasks,
    #[serde(default)]
    pub cumulative_layout_shift: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_timing: Option<UserTiming>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub text: String,
    pub element_summary: String,
    pub correlation_id: String,
    pub rect: AnnotationRect,
    pub page_url: String,
    pub timestamp: i64,
}

/// Out-of-band element detail, looked up by `correlation_id` with a TTL;
/// lives in the store (C7), not a ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDetail {
    pub correlation_id: String,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventPayload {
    ConsoleLog(ConsoleLog),
    NetworkWaterfallEntry(NetworkWaterfallEntry),
    NetworkBody(NetworkBody),
    WSEvent(WSEvent),
    Action(Action),
    PerfSnapshot(PerfSnapshot),
    Annotation(Annotation),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub category: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(category: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            tab_id: None,
            url: None,
            category: category.into(),
            payload,
        }
    }

    pub fn console_level(&self) -> Option<ConsoleLevel> {
        match &self.payload {
            EventPayload::ConsoleLog(log) => Some(log.level),
            _ => None,
        }
    }

    pub fn start_time_ms(&self) -> Option<f64> {
        match &self.payload {
            EventPayload::NetworkWaterfallEntry(entry) => Some(entry.start_time_ms),
            _ => None,
        }
    }

    /// Substring match target used by the `match` filter parameter.
    pub fn searchable_text(&self) -> String {
        match &self.payload {
            EventPayload::ConsoleLog(log) => log.message.clone(),
            EventPayload::NetworkWaterfallEntry(e) => e.url.clone(),
            EventPayload::NetworkBody(b) => b.url.clone(),
            EventPayload::WSEvent(w) => w.url.clone(),
            EventPayload::Action(a) => a.source.clone(),
            EventPayload::PerfSnapshot(_) => String::new(),
            EventPayload::Annotation(a) => a.text.clone(),
        }
    }
}
