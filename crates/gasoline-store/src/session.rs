//! Draw-mode session persistence (§4.7). One JSON file per `tab_id` (or per
//! `session_name` when the caller supplies one), written atomically.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to persist file: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("malformed session file: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("path not allowed: {0}")]
    PathNotAllowed(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub tab_id: String,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
    #[serde(default)]
    pub element_details: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub screenshot: Option<String>,
    pub page_url: String,
    pub stored_at: chrono::DateTime<chrono::Utc>,
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_for(&self, tab_id: &str, session_name: Option<&str>) -> String {
        let raw = session_name.unwrap_or(tab_id);
        sanitize_key(raw)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Stores a completed draw-mode session. Same-key POSTs overwrite;
    /// named-session POSTs accumulate annotations within the session file.
    pub fn store(&self, mut session: Session) -> Result<(usize, PathBuf), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let key = self.key_for(&session.tab_id, session.session_name.as_deref());
        let path = self.path_for(&key);

        if session.session_name.is_some()
            && let Ok(existing) = self.read_raw(&path)
        {
            session.annotations.splice(0..0, existing.annotations);
            for (k, v) in existing.element_details {
                session.element_details.entry(k).or_insert(v);
            }
        }

        let count = session.annotations.len();
        write_atomic(&path, &session)?;
        Ok((count, path))
    }

    fn read_raw(&self, path: &Path) -> Result<Session, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Lists session files in the directory (`analyze(draw_history)`).
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Reads a session by file name, validating the resolved path stays
    /// inside the sandbox directory before touching the filesystem.
    pub fn read(&self, file_name: &str) -> Result<Session, StoreError> {
        let path = self.resolve_sandboxed(file_name)?;
        self.read_raw(&path)
    }

    fn resolve_sandboxed(&self, file_name: &str) -> Result<PathBuf, StoreError> {
        if file_name.contains("..") || Path::new(file_name).is_absolute() {
            return Err(StoreError::PathNotAllowed(file_name.to_string()));
        }
        let candidate = self.dir.join(file_name);
        let canonical_dir = std::fs::canonicalize(&self.dir).unwrap_or_else(|_| self.dir.clone());
        match std::fs::canonicalize(&candidate) {
            Ok(resolved) if resolved.starts_with(&canonical_dir) => Ok(resolved),
            Ok(_) => Err(StoreError::PathNotAllowed(file_name.to_string())),
            Err(_) => Err(StoreError::PathNotAllowed(file_name.to_string())),
        }
    }
}

fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn write_atomic(path: &Path, session: &Session) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let tmp_file = NamedTempFile::new_in(parent)?;
    let json = serde_json::to_string_pretty(session)?;
    std::fs::write(tmp_file.path(), json)?;
    tmp_file.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tab_id: &str) -> Session {
        Session {
            tab_id: tab_id.to_string(),
            session_name: None,
            annotations: vec![serde_json::json!({"id": "a1"})],
            element_details: HashMap::new(),
            screenshot: None,
            page_url: "https://example.com".to_string(),
            stored_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn same_key_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.store(sample("tab-1")).unwrap();
        let (count, _) = store.store(sample("tab-1")).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn named_session_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let mut s1 = sample("tab-1");
        s1.session_name = Some("my-session".to_string());
        store.store(s1).unwrap();

        let mut s2 = sample("tab-1");
        s2.session_name = Some("my-session".to_string());
        s2.annotations = vec![serde_json::json!({"id": "a2"})];
        let (count, _) = store.store(s2).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.store(sample("tab-1")).unwrap();
        let result = store.read("../escape.json");
        assert!(matches!(result, Err(StoreError::PathNotAllowed(_))));
    }

    #[test]
    fn absolute_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let result = store.read("/etc/passwd");
        assert!(matches!(result, Err(StoreError::PathNotAllowed(_))));
    }

    #[test]
    fn list_returns_stored_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.store(sample("tab-1")).unwrap();
        let names = store.list().unwrap();
        assert_eq!(names, vec!["tab-1.json".to_string()]);
    }
}
