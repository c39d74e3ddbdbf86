//! Dynamic upgrade detection (§4.10): poll the on-disk binary every ~30s;
//! if its mtime advances and `--version` now reports a different string,
//! record the pending upgrade for `/health`, drop a marker file for the
//! successor, and ask the daemon to shut down within the grace period.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;
use std::time::SystemTime;

use gasoline_http::UpgradePending;
use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::sync::Notify;

use crate::paths::upgrade_marker_path;

const POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const UPGRADE_GRACE_PERIOD: Duration = Duration::from_secs(40);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeMarker {
    pub from_version: String,
    pub to_version: String,
    pub detected_at: chrono::DateTime<chrono::Utc>,
}

pub fn read_marker() -> Option<UpgradeMarker> {
    let path = upgrade_marker_path().ok()?;
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn write_marker(marker: &UpgradeMarker) -> std::io::Result<()> {
    let path = upgrade_marker_path()?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let tmp_file = NamedTempFile::new_in(parent)?;
    let json = serde_json::to_string_pretty(marker)?;
    std::fs::write(tmp_file.path(), json)?;
    tmp_file.persist(&path).map_err(|e| e.error)?;
    Ok(())
}

/// Spawns the watcher task. Returns its join handle; dropping the handle
/// does not stop the watcher, it runs until the process exits or the
/// shutdown notifier fires the daemon down.
pub fn spawn(
    binary_path: PathBuf,
    current_version: String,
    upgrade_pending: Arc<RwLock<Option<UpgradePending>>>,
    shutdown: Arc<Notify>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_mtime = mtime(&binary_path);
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        loop {
            interval.tick().await;

            let current_mtime = mtime(&binary_path);
            if current_mtime <= last_mtime {
                continue;
            }
            last_mtime = current_mtime;

            let Some(on_disk_version) = read_version(&binary_path).await else {
                continue;
            };
            if on_disk_version == current_version {
                continue;
            }

            tracing::info!(from = %current_version, to = %on_disk_version, "detected binary upgrade");

            let marker = UpgradeMarker {
                from_version: current_version.clone(),
                to_version: on_disk_version.clone(),
                detected_at: chrono::Utc::now(),
            };
            if let Err(e) = write_marker(&marker) {
                tracing::warn!(error = %e, "failed to write upgrade marker");
            }

            *upgrade_pending.write().unwrap_or_else(|e| e.into_inner()) = Some(UpgradePending {
                new_version: on_disk_version,
            });

            tokio::time::sleep(UPGRADE_GRACE_PERIOD).await;
            shutdown.notify_one();
            break;
        }
    })
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

async fn read_version(path: &Path) -> Option<String> {
    let output = tokio::process::Command::new(path).arg("--version").output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtime_is_none_for_a_missing_path() {
        assert!(mtime(Path::new("/nonexistent/definitely-not-here")).is_none());
    }

    #[test]
    fn mtime_is_some_for_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary");
        std::fs::write(&path, b"fake binary").unwrap();
        assert!(mtime(&path).is_some());
    }

    #[tokio::test]
    async fn read_version_is_none_for_an_unexecutable_path() {
        assert!(read_version(Path::new("/nonexistent/definitely-not-here")).await.is_none());
    }
}
