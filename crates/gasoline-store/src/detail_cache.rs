//! In-memory, TTL-bounded cache of annotation `ElementDetail` records keyed
//! by `correlation_id` (§4.7). Expired or absent entries surface as
//! `not_found_or_expired` to the caller rather than panicking.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;

struct Entry {
    value: Value,
    expires_at: Instant,
}

pub struct ElementDetailCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ElementDetailCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, correlation_id: String, value: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            correlation_id,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Returns `None` for both "never existed" and "expired" — callers map
    /// both to the same `not_found_or_expired` error.
    pub fn get(&self, correlation_id: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(correlation_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(correlation_id);
                None
            }
            None => None,
        }
    }
}

impl Default for ElementDetailCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let cache = ElementDetailCache::default();
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn expired_entry_is_treated_as_missing() {
        let cache = ElementDetailCache::new(Duration::from_millis(1));
        cache.insert("a1".to_string(), serde_json::json!({"x": 1}));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("a1").is_none());
    }

    #[test]
    fn fresh_entry_is_returned() {
        let cache = ElementDetailCache::new(Duration::from_secs(60));
        cache.insert("a1".to_string(), serde_json::json!({"x": 1}));
        assert_eq!(cache.get("a1").unwrap()["x"], 1);
    }
}
