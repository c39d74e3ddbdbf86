//! Two-tier noise rule catalog: built-ins compiled into the binary plus a
//! user catalog persisted to disk with atomic rewrites (§4.3).

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::rule::CompiledRule;
use crate::rule::NewRuleSpec;
use crate::rule::NoiseRule;
use crate::rule::builtin_rules;

#[derive(Debug, thiserror::Error)]
pub enum NoiseStoreError {
    #[error("io error persisting noise rules: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to persist noise rules: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    next_user_id: u64,
    rules: Vec<NoiseRule>,
}

struct Inner {
    next_user_id: u64,
    user_rules: Vec<CompiledRule>,
}

pub struct NoiseStore {
    path: PathBuf,
    builtins: Vec<CompiledRule>,
    inner: Mutex<Inner>,
}

/// Candidate event shape the matcher and the auto-detector both work over;
/// callers translate ring-buffer events into this before calling in.
pub struct Candidate<'a> {
    pub url: Option<&'a str>,
    pub message: Option<&'a str>,
    pub status: Option<u16>,
}

impl NoiseStore {
    /// Loads persisted user rules from `path`. A corrupted or missing file
    /// logs and falls back to built-ins only — the store never fails to
    /// construct, and `next_user_id` never regresses once something has
    /// been written.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<PersistedState>(&contents) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "noise rules file is corrupted, starting from built-ins only");
                    PersistedState::default()
                }
            },
            Err(_) => PersistedState::default(),
        };

        let builtins = builtin_rules().into_iter().map(CompiledRule::compile).collect();
        let user_rules = state.rules.into_iter().map(CompiledRule::compile).collect();

        Self {
            path,
            builtins,
            inner: Mutex::new(Inner {
                next_user_id: state.next_user_id,
                user_rules,
            }),
        }
    }

    pub fn list(&self) -> Vec<NoiseRule> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.builtins
            .iter()
            .chain(inner.user_rules.iter())
            .map(|c| c.rule.clone())
            .collect()
    }

    pub fn add(&self, specs: Vec<NewRuleSpec>) -> Result<Vec<NoiseRule>, NoiseStoreError> {
        let mut added = Vec::with_capacity(specs.len());
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            for spec in specs {
                let id = format!("user_{}", inner.next_user_id + 1);
                inner.next_user_id += 1;
                let rule = NoiseRule {
                    id,
                    category: spec.category,
                    match_spec: spec.match_spec,
                    classification: spec.classification,
                };
                added.push(rule.clone());
                inner.user_rules.push(CompiledRule::compile(rule));
            }
        }
        self.persist()?;
        Ok(added)
    }

    pub fn remove(&self, id: &str) -> Result<bool, NoiseStoreError> {
        let removed = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let before = inner.user_rules.len();
            inner.user_rules.retain(|c| c.rule.id != id);
            inner.user_rules.len() != before
        };
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Clears user rules only; built-ins and `next_user_id` are untouched so
    /// previously removed/added ids are never reissued.
    pub fn reset(&self) -> Result<(), NoiseStoreError> {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.user_rules.clear();
        }
        self.persist()
    }

    pub fn classify(&self, candidate: &Candidate) -> Option<NoiseRule> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.builtins
            .iter()
            .chain(inner.user_rules.iter())
            .find(|c| c.matches(candidate.url, candidate.message, candidate.status))
            .map(|c| c.rule.clone())
    }

    fn persist(&self) -> Result<(), NoiseStoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let state = PersistedState {
            next_user_id: inner.next_user_id,
            rules: inner.user_rules.iter().map(|c| c.rule.clone()).collect(),
        };
        drop(inner);
        write_atomic(&self.path, &state)
    }
}

fn write_atomic(path: &Path, state: &PersistedState) -> Result<(), NoiseStoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_file = NamedTempFile::new_in(parent)?;
    let json = serde_json::to_string_pretty(state).map_err(|e| {
        NoiseStoreError::Io(std::io::Error::other(e))
    })?;
    std::fs::write(tmp_file.path(), json)?;
    tmp_file.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Classification;
    use crate::rule::MatchSpec;
    use crate::rule::NoiseCategory;

    #[test]
    fn user_ids_are_monotone_and_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");

        let store = NoiseStore::load(&path);
        let added = store
            .add(vec![NewRuleSpec {
                category: NoiseCategory::Console,
                match_spec: MatchSpec::default(),
                classification: Classification::Framework,
            }])
            .unwrap();
        assert_eq!(added[0].id, "user_1");

        let added2 = store
            .add(vec![NewRuleSpec {
                category: NoiseCategory::Console,
                match_spec: MatchSpec::default(),
                classification: Classification::Framework,
            }])
            .unwrap();
        assert_eq!(added2[0].id, "user_2");

        assert!(store.remove("user_1").unwrap());

        // Simulate a restart: reload from disk.
        let reloaded = NoiseStore::load(&path);
        let ids: Vec<String> = reloaded.list().into_iter().map(|r| r.id).collect();
        assert!(!ids.contains(&"user_1".to_string()));
        assert!(ids.contains(&"user_2".to_string()));

        let added3 = reloaded
            .add(vec![NewRuleSpec {
                category: NoiseCategory::Console,
                match_spec: MatchSpec::default(),
                classification: Classification::Framework,
            }])
            .unwrap();
        assert_eq!(added3[0].id, "user_3");
    }

    #[test]
    fn corrupted_file_falls_back_to_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = NoiseStore::load(&path);
        assert_eq!(store.list().len(), builtin_rules().len());
    }

    #[test]
    fn reset_clears_only_user_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let store = NoiseStore::load(&path);
        store
            .add(vec![NewRuleSpec {
                category: NoiseCategory::Console,
                match_spec: MatchSpec::default(),
                classification: Classification::Framework,
            }])
            .unwrap();
        store.reset().unwrap();
        assert_eq!(store.list().len(), builtin_rules().len());
    }
}
