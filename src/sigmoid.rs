//! Sigmoid-based transition curve: solar temperature, manual-override
//! temperature, and auto-resume scheduling.

use chrono::{DateTime, Utc};

use crate::common::constants::{
    CLOUD_THRESHOLD, DAWN_DURATION, DUSK_DURATION, SIGMOID_STEEPNESS, TEMP_DAY_CLEAR,
    TEMP_DAY_DARK, TEMP_NIGHT,
};
use crate::common::utils::minutes_between;
use crate::ephemeris::{self, SunTimes};

/// `s(x, k) = 1 / (1 + e^(-kx))`.
fn logistic(x: f64, k: f64) -> f64 {
    1.0 / (1.0 + (-k * x).exp())
}

/// Normalized sigmoid: `S(-1, k) = 0`, `S(1, k) = 1` exactly.
pub fn normalized_sigmoid(x: f64, k: f64) -> f64 {
    let lo = logistic(-1.0, k);
    let hi = logistic(1.0, k);
    (logistic(x, k) - lo) / (hi - lo)
}

/// Solar color temperature from dawn/dusk proximity and cached cloud cover.
///
/// `minutes_since_sunrise` and `minutes_until_sunset` are signed minute
/// offsets from the nearest sunrise/sunset of the current day.
pub fn calculate_solar_temp(
    minutes_since_sunrise: f64,
    minutes_until_sunset: f64,
    dark_mode: bool,
) -> u32 {
    let day = if dark_mode { TEMP_DAY_DARK } else { TEMP_DAY_CLEAR };
    let night = TEMP_NIGHT;
    let dawn_half = DAWN_DURATION / 2.0;
    let dusk_half = DUSK_DURATION / 2.0;

    if minutes_since_sunrise.abs() < dawn_half {
        let x = minutes_since_sunrise / dawn_half;
        blend(night, day, x)
    } else if minutes_until_sunset.abs() < dusk_half {
        let x = minutes_until_sunset / dusk_half;
        blend(night, day, x)
    } else if minutes_since_sunrise >= dawn_half && minutes_until_sunset >= dusk_half {
        day
    } else {
        night
    }
}

fn blend(night: u32, day: u32, x: f64) -> u32 {
    let s = normalized_sigmoid(x, SIGMOID_STEEPNESS);
    (night as f64 + (day as f64 - night as f64) * s).round() as u32
}

/// Manual-override color temperature.
pub fn calculate_manual_temp(
    start_temp: u32,
    target_temp: u32,
    start_time: DateTime<Utc>,
    duration_minutes: u32,
    now: DateTime<Utc>,
) -> u32 {
    if duration_minutes == 0 {
        return target_temp;
    }
    let elapsed = minutes_between(start_time, now);
    if elapsed >= duration_minutes as f64 {
        return target_temp;
    }
    let x = 2.0 * elapsed / duration_minutes as f64 - 1.0;
    let s = normalized_sigmoid(x, SIGMOID_STEEPNESS);
    (start_temp as f64 + (target_temp as f64 - start_temp as f64) * s).round() as u32
}

/// True iff cached cloud cover crosses the dark-mode threshold.
pub fn is_dark_mode(cloud_cover: u32) -> bool {
    cloud_cover >= CLOUD_THRESHOLD
}

/// Minutes since today's sunrise / until today's sunset, for the current day.
pub fn minutes_from_sun_events(now: DateTime<Utc>, sun_times: &SunTimes) -> (f64, f64) {
    (
        minutes_between(sun_times.sunrise, now),
        minutes_between(now, sun_times.sunset),
    )
}

/// Earliest future instant at which the daemon should auto-resume from
/// manual mode: 15 minutes before the next dawn- or dusk-window start.
pub fn next_transition_resume(
    now: DateTime<Utc>,
    lat: f64,
    lon: f64,
    tz_offset_hours: f64,
) -> DateTime<Utc> {
    use chrono::{Datelike, Duration};

    const AUTO_RESUME_LEAD_MINUTES: i64 = 15;

    let local_now = now + Duration::seconds((tz_offset_hours * 3600.0) as i64);
    let today = local_now.date_naive();
    let tomorrow = today + Duration::days(1);

    let today_times = ephemeris::sunrise_sunset(
        today.year(),
        today.month(),
        today.day(),
        lat,
        lon,
        tz_offset_hours,
    );
    let tomorrow_times = ephemeris::sunrise_sunset(
        tomorrow.year(),
        tomorrow.month(),
        tomorrow.day(),
        lat,
        lon,
        tz_offset_hours,
    );

    if !today_times.valid && !tomorrow_times.valid {
        return now + Duration::hours(24);
    }

    let dawn_half = Duration::seconds((DAWN_DURATION / 2.0 * 60.0) as i64);
    let dusk_half = Duration::seconds((DUSK_DURATION / 2.0 * 60.0) as i64);
    let lead = Duration::minutes(AUTO_RESUME_LEAD_MINUTES);

    let mut candidates = Vec::with_capacity(3);
    if today_times.valid {
        candidates.push(today_times.sunrise - dawn_half - lead);
        candidates.push(today_times.sunset - dusk_half - lead);
    }
    if tomorrow_times.valid {
        candidates.push(tomorrow_times.sunrise - dawn_half - lead);
    }

    candidates
        .into_iter()
        .filter(|&t| t > now)
        .min()
        .unwrap_or(now + Duration::hours(24))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_sigmoid_endpoints() {
        for k in [0.5, 1.0, 6.0, 8.0, 20.0] {
            assert!((normalized_sigmoid(-1.0, k) - 0.0).abs() < 1e-12);
            assert!((normalized_sigmoid(1.0, k) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn solar_temp_at_sunrise_is_midpoint() {
        let clear = calculate_solar_temp(0.0, 1000.0, false);
        let dark = calculate_solar_temp(0.0, 1000.0, true);
        let expected = (TEMP_NIGHT + TEMP_DAY_CLEAR) / 2;
        assert!((clear as i64 - expected as i64).abs() <= 1);
        // Midpoint is independent of dark_mode at the exact sunrise instant.
        let expected_dark = (TEMP_NIGHT + TEMP_DAY_DARK) / 2;
        assert!((dark as i64 - expected_dark as i64).abs() <= 1);
    }

    #[test]
    fn solar_temp_outside_window_is_exact_day_or_night() {
        let dawn_half = DAWN_DURATION / 2.0;
        let at_edge = calculate_solar_temp(dawn_half, 1000.0, false);
        assert_eq!(at_edge, TEMP_DAY_CLEAR);
        let before_edge = calculate_solar_temp(-dawn_half, 1000.0, false);
        assert_eq!(before_edge, TEMP_NIGHT);
    }

    #[test]
    fn manual_temp_boundaries() {
        let t0 = Utc::now();
        assert_eq!(calculate_manual_temp(6500, 2900, t0, 0, t0), 2900);
        assert_eq!(calculate_manual_temp(6500, 2900, t0, 30, t0), 6500);
        let later = t0 + chrono::Duration::minutes(30);
        assert_eq!(calculate_manual_temp(6500, 2900, t0, 30, later), 2900);
    }

    #[test]
    fn auto_resume_is_always_strictly_future() {
        let now = Utc::now();
        let resume = next_transition_resume(now, 41.88, -87.63, -6.0);
        assert!(resume > now);
    }

    #[test]
    fn manual_temp_partial_is_midpoint() {
        let t0 = Utc::now();
        let mid = t0 + chrono::Duration::minutes(15);
        let temp = calculate_manual_temp(6500, 2900, t0, 30, mid);
        assert!((temp as i64 - 4700).abs() <= 1);
    }
}
