//! `--set TEMP [MINUTES]`: write a manual override (spec §4.8, §6).

use anyhow::{Context, Result};
use chrono::Utc;

use crate::common::constants::DEFAULT_OVERRIDE_DURATION_MINUTES;
use crate::override_state::OverrideState;
use crate::paths::Paths;
use crate::pidfile;

pub fn run(paths: &Paths, temp: u32, minutes: Option<u32>) -> Result<()> {
    paths.ensure_config_dir().context("creating config directory")?;

    let override_state = OverrideState {
        active: true,
        target_temp: temp,
        duration_minutes: minutes.unwrap_or(DEFAULT_OVERRIDE_DURATION_MINUTES),
        issued_at: Utc::now().timestamp(),
        // The daemon fills this in on first observation, from whatever
        // temperature it currently has applied.
        start_temp: 0,
    };
    override_state
        .write(&paths.override_file)
        .with_context(|| format!("writing {}", paths.override_file.display()))?;

    log_version!();
    log_pipe!();
    log_decorated!("override set: {} K over {} min", temp, override_state.duration_minutes);
    if !pidfile::is_daemon_alive(&paths.pid_file) {
        log_warning!("daemon is not running; this will take effect once it starts");
    }
    log_end!();
    Ok(())
}
