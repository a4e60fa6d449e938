//! `--set-location LOC`: `LOC` is either `lat,lon` or a 5-digit ZIP code
//! resolved through the external ZIP table (spec §6).

use anyhow::{Context, Result, bail};

use crate::location::Location;
use crate::paths::Paths;
use crate::zipcode::ZipTable;

pub fn run(paths: &Paths, loc: &str) -> Result<()> {
    paths.ensure_config_dir().context("creating config directory")?;

    let location = if loc.len() == 5 && loc.bytes().all(|b| b.is_ascii_digit()) {
        resolve_zip(paths, loc)?
    } else {
        Location::parse_lat_lon(loc)
            .filter(|l| l.valid)
            .ok_or_else(|| anyhow::anyhow!("'{loc}' is not a valid \"lat,lon\" pair"))?
    };

    location
        .write(&paths.config_ini)
        .with_context(|| format!("writing {}", paths.config_ini.display()))?;

    log_version!();
    log_pipe!();
    log_decorated!("location set: {:.6}, {:.6}", location.latitude, location.longitude);
    log_end!();
    Ok(())
}

fn resolve_zip(paths: &Paths, zip: &str) -> Result<Location> {
    let table = ZipTable::open(&paths.zip_table)
        .with_context(|| format!("opening ZIP table at {}", paths.zip_table.display()))?;
    let Some((lat, lon)) = table.lookup(zip) else {
        bail!("ZIP code '{zip}' not found");
    };
    Ok(Location::new(lat as f64, lon as f64))
}
