//! Generic namespaced key/value persistence backing `configure(store)` and
//! the `interact` state-snapshot quartet. One JSON file per namespace,
//! written atomically; a corrupted namespace file starts that namespace
//! empty rather than aborting the daemon.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::session::StoreError;

pub struct KvStore {
    dir: PathBuf,
    cache: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl KvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(BTreeMap::new()),
        }
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(namespace)))
    }

    fn load_namespace(&self, namespace: &str) -> BTreeMap<String, Value> {
        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = cache.get(namespace) {
                return existing.clone();
            }
        }
        let path = self.namespace_path(namespace);
        let loaded = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(namespace.to_string(), loaded);
        cache.get(namespace).cloned().unwrap_or_default()
    }

    pub fn store(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let mut map = self.load_namespace(namespace);
        map.insert(key.to_string(), value);
        self.persist(namespace, &map)
    }

    pub fn load(&self, namespace: &str, key: &str) -> Option<Value> {
        self.load_namespace(namespace).get(key).cloned()
    }

    pub fn list(&self, namespace: &str) -> Vec<String> {
        self.load_namespace(namespace).keys().cloned().collect()
    }

    pub fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let mut map = self.load_namespace(namespace);
        let existed = map.remove(key).is_some();
        if existed {
            self.persist(namespace, &map)?;
        }
        Ok(existed)
    }

    fn persist(&self, namespace: &str, map: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.namespace_path(namespace);
        write_atomic(&path, map)?;
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(namespace.to_string(), map.clone());
        Ok(())
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn write_atomic(path: &Path, map: &BTreeMap<String, Value>) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let tmp_file = NamedTempFile::new_in(parent)?;
    let json = serde_json::to_string_pretty(map)?;
    std::fs::write(tmp_file.path(), json)?;
    tmp_file.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        kv.store("states", "checkout-flow", serde_json::json!({"cookies": []})).unwrap();
        let loaded = kv.load("states", "checkout-flow").unwrap();
        assert_eq!(loaded["cookies"], serde_json::json!([]));
    }

    #[test]
    fn delete_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        kv.store("states", "a", serde_json::json!(1)).unwrap();
        assert!(kv.delete("states", "a").unwrap());
        assert!(kv.load("states", "a").is_none());
    }

    #[test]
    fn list_returns_all_keys_in_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        kv.store("states", "a", serde_json::json!(1)).unwrap();
        kv.store("states", "b", serde_json::json!(2)).unwrap();
        let mut keys = kv.list("states");
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
