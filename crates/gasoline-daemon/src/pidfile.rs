//! PID file management for `--daemon`/`--stop` (§4.10).

use std::path::Path;

use crate::paths::pid_file_path;

#[derive(Debug, thiserror::Error)]
pub enum PidFileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pid file contents are not a valid process id: {0}")]
    Malformed(String),
}

pub fn write(port: u16, pid: i32) -> Result<(), PidFileError> {
    let path = pid_file_path(port)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, pid.to_string())?;
    Ok(())
}

pub fn read(port: u16) -> Result<Option<i32>, PidFileError> {
    let path = pid_file_path(port)?;
    read_path(&path)
}

fn read_path(path: &Path) -> Result<Option<i32>, PidFileError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| PidFileError::Malformed(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn remove(port: u16) -> Result<(), PidFileError> {
    let path = pid_file_path(port)?;
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pid_file_reads_as_none() {
        let result = read_path(Path::new("/nonexistent/does-not-exist.pid"));
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn malformed_pid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pid");
        std::fs::write(&path, "not-a-pid").unwrap();
        let result = read_path(&path);
        assert!(matches!(result, Err(PidFileError::Malformed(_))));
    }
}
