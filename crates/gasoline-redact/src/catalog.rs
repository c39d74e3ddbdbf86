use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::Pattern;
use crate::luhn::passes_luhn;

/// Shape of the optional user redaction config: `{patterns:[{name,pattern,replacement?}]}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserPatternConfig {
    #[serde(default)]
    pub patterns: Vec<UserPattern>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserPattern {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub replacement: Option<String>,
}

/// Compiles the fixed built-in catalog. Each entry here is a real secret
/// shape seen in the wild; order matters only in that a pattern run earlier
/// (e.g. `bearer-token`) consumes text a later, more generic pattern (e.g.
/// `jwt`) would otherwise also match, which keeps the catalog from double
/// tagging the same substring.
pub(crate) fn builtin_patterns() -> Vec<Pattern> {
    let specs: &[(&str, &str, Option<Validator>)] = &[
        ("aws-access-key", r"\bAKIA[0-9A-Z]{16}\b", None),
        ("bearer-token", r"Bearer\s+[A-Za-z0-9\-\._~+/]+=*", None),
        ("basic-auth", r"Basic\s+[A-Za-z0-9+/]+=*", None),
        (
            "jwt",
            r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+",
            None,
        ),
        ("github-pat", r"gh[poutsr]_[A-Za-z0-9]{20,255}\b", None),
        (
            "pem-private-key",
            r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----[\s\S]+?-----END (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----",
            None,
        ),
        (
            "credit-card",
            r"\b(?:\d[ -]?){12,18}\d\b",
            Some(passes_luhn as Validator),
        ),
        ("ssn", r"\b\d{3}-\d{2}-\d{4}\b", None),
        (
            "api-key",
            r"(?i)(?:api_key|secret_key)\s*[:=]\s*['\x22]?[A-Za-z0-9\-_]{8,}['\x22]?",
            None,
        ),
        (
            "session-cookie",
            r"(?i)(?:session(?:_?id)?|connect\.sid|\bsid)\s*=\s*[A-Za-z0-9%+/_.\-]{16,}",
            None,
        ),
    ];

    let mut patterns = Vec::with_capacity(specs.len());
    for (name, src, validator) in specs {
        match Regex::new(src) {
            Ok(regex) => patterns.push(Pattern {
                name,
                regex,
                replacement: None,
                validator: *validator,
            }),
            Err(e) => {
                // A built-in failing to compile is a programming error, not a
                // runtime condition, but we still never want it to crash the
                // daemon: log loudly and keep the rest of the catalog.
                tracing::error!(name = %name, error = %e, "built-in redaction pattern failed to compile");
            }
        }
    }
    patterns
}

type Validator = fn(&str) -> bool;
