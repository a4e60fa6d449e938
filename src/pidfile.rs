//! PID file write/liveness-check/remove. Advisory only — no locking
//! (spec §4.5, §5: "a second daemon started accidentally would race on the
//! display; this is acceptable given the advisory PID check").

use std::path::Path;

use nix::sys::signal::kill;
use nix::unistd::Pid;

pub fn write(path: &Path) -> std::io::Result<()> {
    std::fs::write(path, std::process::id().to_string())
}

pub fn remove(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Read the PID file and check liveness via `kill(pid, 0)`. Absence of the
/// file or a non-numeric contents means "not alive". `ESRCH` means "not
/// alive"; any other errno is treated as "alive" (the process exists but we
/// can't signal it, e.g. owned by another user).
pub fn is_daemon_alive(path: &Path) -> bool {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return false;
    };
    let Ok(pid) = contents.trim().parse::<i32>() else {
        return false;
    };
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips_pid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.pid");
        write(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, std::process::id().to_string());
    }

    #[test]
    fn absent_file_is_not_alive() {
        assert!(!is_daemon_alive(Path::new("/nonexistent/daemon.pid")));
    }

    #[test]
    fn own_pid_is_alive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.pid");
        write(&path).unwrap();
        assert!(is_daemon_alive(&path));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.pid");
        remove(&path).unwrap();
        remove(&path).unwrap();
    }
}
