//! `--refresh`: force a synchronous weather fetch and update the cache
//! (spec §4.8). Unlike the daemon's own fetch, this one is allowed to block
//! — a short-lived CLI invocation has no event loop to keep servicing.

use anyhow::{Context, bail};

use crate::location::Location;
use crate::paths::Paths;
use crate::weather::{self, fetch::fetch_sync};

pub fn run(paths: &Paths) -> anyhow::Result<()> {
    let location = Location::read(&paths.config_ini);
    if !location.valid {
        bail!("no location configured");
    }

    log_version!();
    log_pipe!();
    log_decorated!("fetching weather for {:.4}, {:.4}...", location.latitude, location.longitude);

    match fetch_sync(location.latitude, location.longitude) {
        Ok(data) => {
            weather::cache::write(&paths.weather_cache, &data)
                .with_context(|| format!("writing {}", paths.weather_cache.display()))?;
            log_decorated!("weather updated: {} ({}% cloud)", data.forecast, data.cloud_cover);
            log_end!();
            Ok(())
        }
        Err(e) => {
            let erroneous = crate::weather::WeatherData::erroneous();
            let _ = weather::cache::write(&paths.weather_cache, &erroneous);
            log_end!();
            bail!("weather fetch failed: {e}")
        }
    }
}
