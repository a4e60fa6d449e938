//! `--resume`: clear a manual override (spec §4.8). The daemon treats a
//! deleted override file identically to `active=false`, so resuming simply
//! removes it.

use anyhow::{Context, Result};

use crate::override_state::OverrideState;
use crate::paths::Paths;
use crate::pidfile;

pub fn run(paths: &Paths) -> Result<()> {
    OverrideState::clear(&paths.override_file)
        .with_context(|| format!("removing {}", paths.override_file.display()))?;

    log_version!();
    log_pipe!();
    log_decorated!("override cleared; resuming solar mode");
    if !pidfile::is_daemon_alive(&paths.pid_file) {
        log_warning!("daemon is not running; this will take effect once it starts");
    }
    log_end!();
    Ok(())
}
