//! `--stop --port N` (§4.10): signal the PID in the port's PID file, wait
//! briefly for a clean exit, escalate to SIGKILL if it's still alive, then
//! remove the PID file. Leaves the port free for the next daemon to bind.

use std::time::Duration;

use crate::pidfile;

#[derive(Debug, thiserror::Error)]
pub enum StopError {
    #[error(transparent)]
    PidFile(#[from] pidfile::PidFileError),
    #[error("no daemon is running on port {0}")]
    NotRunning(u16),
}

const GRACE_PERIOD: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn stop(port: u16) -> Result<(), StopError> {
    let pid = pidfile::read(port)?.ok_or(StopError::NotRunning(port))?;

    send_signal(pid, Signal::Term);

    let deadline = tokio::time::Instant::now() + GRACE_PERIOD;
    while tokio::time::Instant::now() < deadline {
        if !process_alive(pid) {
            pidfile::remove(port)?;
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    if process_alive(pid) {
        send_signal(pid, Signal::Kill);
    }
    pidfile::remove(port)?;
    Ok(())
}

enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn send_signal(pid: i32, signal: Signal) {
    let raw = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    unsafe {
        libc::kill(pid, raw);
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: i32, _signal: Signal) {}

#[cfg(unix)]
fn process_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: i32) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn process_alive_is_true_for_the_current_process() {
        assert!(process_alive(std::process::id() as i32));
    }

    #[test]
    fn process_alive_is_false_for_an_unused_high_pid() {
        // Not watertight (pid reuse is possible in principle), but a pid this
        // high is vanishingly unlikely to be in use in a test sandbox.
        assert!(!process_alive(i32::MAX - 1));
    }
}
