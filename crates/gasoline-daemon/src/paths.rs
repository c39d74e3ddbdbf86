//! Filesystem locations the daemon reads and writes (§6): a PID file per
//! port in the user's home directory, and a run directory holding the
//! upgrade marker.

use std::path::PathBuf;

pub fn home_dir() -> std::io::Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| std::io::Error::other("could not determine home directory"))
}

pub fn pid_file_path(port: u16) -> std::io::Result<PathBuf> {
    Ok(home_dir()?.join(format!(".gasoline-{port}.pid")))
}

pub fn run_dir() -> std::io::Result<PathBuf> {
    Ok(home_dir()?.join(".gasoline").join("run"))
}

pub fn upgrade_marker_path() -> std::io::Result<PathBuf> {
    Ok(run_dir()?.join("last-upgrade.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_file_path_is_named_after_its_port() {
        let path = pid_file_path(47821).unwrap();
        assert_eq!(path.file_name().unwrap(), ".gasoline-47821.pid");
    }

    #[test]
    fn upgrade_marker_path_lives_under_the_run_dir() {
        let marker = upgrade_marker_path().unwrap();
        let run = run_dir().unwrap();
        assert_eq!(marker.parent().unwrap(), run);
        assert_eq!(marker.file_name().unwrap(), "last-upgrade.json");
    }
}
