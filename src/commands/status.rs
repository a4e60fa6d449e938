//! `--status`: print location, today's sunrise/sunset/elevation, the latest
//! cached weather (or "not available"), and the current mode (spec §6).

use anyhow::Result;
use chrono::{Datelike, Utc};

use crate::common::utils::private_path;
use crate::location::Location;
use crate::override_state::OverrideState;
use crate::paths::Paths;
use crate::{ephemeris, sigmoid, weather};

pub fn run(paths: &Paths) -> Result<()> {
    log_version!();
    log_pipe!();

    let location = Location::read(&paths.config_ini);
    if !location.valid {
        log_decorated!("location: not configured");
        log_indented!("run --set-location LAT,LON or --set-location ZIP");
        log_end!();
        return Ok(());
    }
    log_decorated!("location: {:.6}, {:.6}", location.latitude, location.longitude);

    let now = Utc::now();
    let tz_offset = ephemeris::local_utc_offset_hours();
    let date = now.date_naive();
    log_decorated!("date: {}", date);

    let sun_times = ephemeris::sunrise_sunset(
        date.year(),
        date.month(),
        date.day(),
        location.latitude,
        location.longitude,
        tz_offset,
    );
    if sun_times.valid {
        log_decorated!("sunrise: {}", sun_times.sunrise.with_timezone(&chrono::Local).format("%H:%M:%S"));
        log_decorated!("sunset: {}", sun_times.sunset.with_timezone(&chrono::Local).format("%H:%M:%S"));
    } else {
        log_decorated!("sunrise/sunset: not available (polar day or night)");
    }

    let position = ephemeris::solar_position(now, location.latitude, location.longitude, tz_offset);
    log_decorated!("sun elevation: {:.1}°", position.elevation_degrees);

    let weather_data = weather::cache::read(&paths.weather_cache);
    if weather_data.has_error {
        log_decorated!("weather: not available");
    } else {
        log_decorated!(
            "weather: {} ({}% cloud, {:.0}°F)",
            weather_data.forecast, weather_data.cloud_cover, weather_data.temperature_f
        );
    }

    let override_state = OverrideState::read(&paths.override_file).filter(|ov| ov.active);
    match override_state {
        Some(ov) => {
            let issued = chrono::DateTime::<Utc>::from_timestamp(ov.issued_at, 0)
                .unwrap_or(now)
                .with_timezone(&chrono::Local);
            let target = sigmoid::calculate_manual_temp(
                ov.start_temp,
                ov.target_temp,
                chrono::DateTime::<Utc>::from_timestamp(ov.issued_at, 0).unwrap_or(now),
                ov.duration_minutes,
                now,
            );
            log_decorated!(
                "mode: manual override, target {} K over {} min, issued {}",
                ov.target_temp,
                ov.duration_minutes,
                issued.format("%H:%M:%S")
            );
            log_indented!("current: {} K", target);
        }
        None => {
            let (since_sunrise, until_sunset) = sigmoid::minutes_from_sun_events(now, &sun_times);
            let dark = sigmoid::is_dark_mode(weather_data.cloud_cover);
            let temp = sigmoid::calculate_solar_temp(since_sunrise, until_sunset, dark);
            log_decorated!("mode: {}, target {} K", if dark { "dark" } else { "clear" }, temp);
        }
    }

    log_indented!("config: {}", private_path(&paths.config_dir));
    log_end!();
    Ok(())
}
