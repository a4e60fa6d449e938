//! `--reset`: restore the display's saved gamma ramps and exit (spec §4.8).
//! The only command besides the daemon itself that touches gamma directly.

use anyhow::{Context, Result};

use crate::backend::Dispatcher;
use crate::override_state::OverrideState;
use crate::paths::Paths;

pub fn run(paths: &Paths) -> Result<()> {
    let mut dispatcher = Dispatcher::probe().context("no usable gamma backend found")?;

    log_version!();
    log_pipe!();
    log_decorated!("restoring display on backend: {}", dispatcher.name());

    dispatcher.restore().context("restore failed")?;
    dispatcher.free();

    let _ = OverrideState::clear(&paths.override_file);

    log_end!();
    Ok(())
}
