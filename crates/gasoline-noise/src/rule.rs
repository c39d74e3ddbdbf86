use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseCategory {
    Console,
    Network,
    Websocket,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Infrastructure,
    Framework,
    UserCode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_equals: Option<u16>,
}

/// A persisted or built-in noise rule. `id` is `builtin_N` for the
/// compiled-in catalog (never written to disk) or `user_N` for rules added
/// at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseRule {
    pub id: String,
    pub category: NoiseCategory,
    pub match_spec: MatchSpec,
    pub classification: Classification,
}

/// Caller-supplied shape for `add()`; the store assigns the id.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRuleSpec {
    pub category: NoiseCategory,
    pub match_spec: MatchSpec,
    pub classification: Classification,
}

pub(crate) struct CompiledRule {
    pub(crate) rule: NoiseRule,
    pub(crate) url_regex: Option<regex::Regex>,
    pub(crate) message_regex: Option<regex::Regex>,
}

impl CompiledRule {
    pub(crate) fn compile(rule: NoiseRule) -> Self {
        let url_regex = rule
            .match_spec
            .url_regex
            .as_deref()
            .and_then(|p| regex::Regex::new(p).ok());
        let message_regex = rule
            .match_spec
            .message_regex
            .as_deref()
            .and_then(|p| regex::Regex::new(p).ok());
        Self {
            rule,
            url_regex,
            message_regex,
        }
    }

    /// Whether a candidate event (described loosely by url/message/status)
    /// matches this rule. All present criteria must match (AND semantics).
    pub(crate) fn matches(&self, url: Option<&str>, message: Option<&str>, status: Option<u16>) -> bool {
        if let Some(re) = &self.url_regex {
            match url {
                Some(u) if re.is_match(u) => {}
                _ => return false,
            }
        }
        if let Some(re) = &self.message_regex {
            match message {
                Some(m) if re.is_match(m) => {}
                _ => return false,
            }
        }
        if let Some(expected) = self.rule.match_spec.status_equals
            && status != Some(expected)
        {
            return false;
        }
        true
    }
}

pub(crate) fn builtin_rules() -> Vec<NoiseRule> {
    vec![
        NoiseRule {
            id: "builtin_1".to_string(),
            category: NoiseCategory::Network,
            match_spec: MatchSpec {
                url_regex: Some(r"chrome-extension://".to_string()),
                message_regex: None,
                status_equals: None,
            },
            classification: Classification::Infrastructure,
        },
        NoiseRule {
            id: "builtin_2".to_string(),
            category: NoiseCategory::Console,
            match_spec: MatchSpec {
                url_regex: None,
                message_regex: Some(r"^\[HMR\]|webpack-dev-server".to_string()),
                status_equals: None,
            },
            classification: Classification::Framework,
        },
        NoiseRule {
            id: "builtin_3".to_string(),
            category: NoiseCategory::Network,
            match_spec: MatchSpec {
                url_regex: Some(r"(?:analytics|doubleclick|googletagmanager)\.".to_string()),
                message_regex: None,
                status_equals: None,
            },
            classification: Classification::Infrastructure,
        },
    ]
}
