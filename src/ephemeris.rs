//! NOAA/Meeus solar ephemeris: elevation, sunrise, and sunset from
//! `(instant, latitude, longitude)`. Pure arithmetic, no I/O.
//!
//! All public angles are degrees; all internal trig uses radians.

use chrono::{DateTime, Datelike, Local, Offset, TimeZone, Timelike, Utc};

const JULIAN_DAY_2000: f64 = 2451545.0;
const JULIAN_DAYS_PER_CENTURY: f64 = 36525.0;

/// Standard solar zenith for sunrise/sunset: 90° plus atmospheric refraction
/// (34 arcmin) plus the sun's apparent radius (16 arcmin).
const SUNRISE_SUNSET_ZENITH_DEG: f64 = 90.833;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    pub elevation_degrees: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub valid: bool,
}

fn julian_day(year: i32, month: u32, day: u32, hour_fraction: f64) -> f64 {
    let (mut y, mut m) = (year as f64, month as f64);
    if m <= 2.0 {
        y -= 1.0;
        m += 12.0;
    }
    let a = (y / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y + 4716.0)).floor() + (30.6001 * (m + 1.0)).floor() + day as f64 + b - 1524.5
        + hour_fraction / 24.0
}

fn julian_century(jd: f64) -> f64 {
    (jd - JULIAN_DAY_2000) / JULIAN_DAYS_PER_CENTURY
}

fn geom_mean_longitude(t: f64) -> f64 {
    let l = 280.46646 + t * (36000.76983 + 0.0003032 * t);
    let r = l.rem_euclid(360.0);
    r
}

fn geom_mean_anomaly(t: f64) -> f64 {
    357.52911 + t * (35999.05029 - 0.0001537 * t)
}

fn earth_orbit_eccentricity(t: f64) -> f64 {
    0.016708634 - t * (0.000042037 + 0.0000001267 * t)
}

fn equation_of_center(t: f64) -> f64 {
    let m = geom_mean_anomaly(t).to_radians();
    m.sin() * (1.914602 - t * (0.004817 + 0.000014 * t))
        + (2.0 * m).sin() * (0.019993 - 0.000101 * t)
        + (3.0 * m).sin() * 0.000289
}

fn sun_true_longitude(t: f64) -> f64 {
    geom_mean_longitude(t) + equation_of_center(t)
}

fn sun_apparent_longitude(t: f64) -> f64 {
    let omega = (125.04 - 1934.136 * t).to_radians();
    sun_true_longitude(t) - 0.00569 - 0.00478 * omega.sin()
}

fn mean_obliquity_of_ecliptic(t: f64) -> f64 {
    let seconds = 21.448 - t * (46.8150 + t * (0.00059 - t * 0.001813));
    23.0 + (26.0 + seconds / 60.0) / 60.0
}

fn obliquity_correction(t: f64) -> f64 {
    let omega = (125.04 - 1934.136 * t).to_radians();
    mean_obliquity_of_ecliptic(t) + 0.00256 * omega.cos()
}

fn sun_declination_degrees(t: f64) -> f64 {
    let epsilon = obliquity_correction(t).to_radians();
    let lambda = sun_apparent_longitude(t).to_radians();
    (epsilon.sin() * lambda.sin()).asin().to_degrees()
}

/// Equation of time in minutes, NOAA closed-form.
fn equation_of_time_minutes(t: f64) -> f64 {
    let epsilon = obliquity_correction(t).to_radians();
    let l0 = geom_mean_longitude(t).to_radians();
    let e = earth_orbit_eccentricity(t);
    let m = geom_mean_anomaly(t).to_radians();

    let y = (epsilon / 2.0).tan().powi(2);

    let result = y * (2.0 * l0).sin() - 2.0 * e * m.sin()
        + 4.0 * e * y * m.sin() * (2.0 * l0).cos()
        - 0.5 * y * y * (4.0 * l0).sin()
        - 1.25 * e * e * (2.0 * m).sin();

    result.to_degrees() * 4.0
}

/// Hour angle in degrees for a given zenith, or `None` if the location is
/// polar for that day (`|cos H| > 1`).
fn hour_angle_degrees(lat_rad: f64, declination_rad: f64, zenith_rad: f64) -> Option<f64> {
    let cos_h = (zenith_rad.cos() - lat_rad.sin() * declination_rad.sin())
        / (lat_rad.cos() * declination_rad.cos());
    if cos_h.abs() > 1.0 {
        None
    } else {
        Some(cos_h.acos().to_degrees())
    }
}

/// Compute sun elevation in degrees at `instant` for `(lat, lon)`.
///
/// `lat`/`lon` in degrees (`lon` positive east). `tz_offset_hours` is the
/// local civil offset from UTC in effect at `instant`.
pub fn solar_position(instant: DateTime<Utc>, lat: f64, lon: f64, tz_offset_hours: f64) -> SunPosition {
    let local = instant + chrono::Duration::seconds((tz_offset_hours * 3600.0) as i64);
    let local_minutes = local.hour() as f64 * 60.0 + local.minute() as f64 + local.second() as f64 / 60.0;
    let hour_fraction = local.hour() as f64
        + local.minute() as f64 / 60.0
        + (local.second() as f64 + local.nanosecond() as f64 / 1e9) / 3600.0;

    let jd = julian_day(local.year(), local.month(), local.day(), hour_fraction);
    let t = julian_century(jd);

    let eot = equation_of_time_minutes(t);
    let declination = sun_declination_degrees(t).to_radians();

    let true_solar_time = local_minutes + eot + 4.0 * lon - 60.0 * tz_offset_hours;
    let mut hour_angle = true_solar_time / 4.0 - 180.0;
    // wrap into [-180, 180]
    while hour_angle > 180.0 {
        hour_angle -= 360.0;
    }
    while hour_angle < -180.0 {
        hour_angle += 360.0;
    }
    let hour_angle = hour_angle.to_radians();

    let lat_rad = lat.to_radians();
    let cos_zenith =
        (lat_rad.sin() * declination.sin() + lat_rad.cos() * declination.cos() * hour_angle.cos())
            .clamp(-1.0, 1.0);
    let elevation = 90.0 - cos_zenith.acos().to_degrees();

    SunPosition {
        elevation_degrees: elevation,
    }
}

/// Compute today's sunrise/sunset for `(lat, lon)` at local civil midnight of
/// `date` (given as a UTC instant at local midnight plus `tz_offset_hours`).
pub fn sunrise_sunset(
    year: i32,
    month: u32,
    day: u32,
    lat: f64,
    lon: f64,
    tz_offset_hours: f64,
) -> SunTimes {
    let jd_noon = julian_day(year, month, day, 12.0);
    let t_noon = julian_century(jd_noon);

    let declination = sun_declination_degrees(t_noon).to_radians();
    let lat_rad = lat.to_radians();
    let zenith_rad = SUNRISE_SUNSET_ZENITH_DEG.to_radians();

    let Some(ha) = hour_angle_degrees(lat_rad, declination, zenith_rad) else {
        let midnight = local_midnight_to_utc(year, month, day, tz_offset_hours);
        return SunTimes {
            sunrise: midnight,
            sunset: midnight,
            valid: false,
        };
    };

    let eot = equation_of_time_minutes(t_noon);

    // Minutes past *local* midnight, local standard time (NOAA closed-form
    // includes the timezone offset here so the result lands on the local
    // clock, not the UTC one).
    let tz_minutes = tz_offset_hours * 60.0;
    let sunrise_local_minutes = 720.0 - 4.0 * (lon + ha) - eot + tz_minutes;
    let sunset_local_minutes = 720.0 - 4.0 * (lon - ha) - eot + tz_minutes;

    let midnight = local_midnight_to_utc(year, month, day, tz_offset_hours);

    SunTimes {
        sunrise: midnight + chrono::Duration::seconds((sunrise_local_minutes * 60.0) as i64),
        sunset: midnight + chrono::Duration::seconds((sunset_local_minutes * 60.0) as i64),
        valid: true,
    }
}

fn local_midnight_to_utc(year: i32, month: u32, day: u32, tz_offset_hours: f64) -> DateTime<Utc> {
    let naive_midnight = chrono::NaiveDate::from_ymd_opt(year, month, day)
        .expect("caller supplies a valid calendar date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");
    DateTime::<Utc>::from_naive_utc_and_offset(naive_midnight, Utc)
        - chrono::Duration::seconds((tz_offset_hours * 3600.0) as i64)
}

/// Current local UTC offset, in hours, as reported by the system timezone.
pub fn local_utc_offset_hours() -> f64 {
    Local::now().offset().fix().local_minus_utc() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::test_constants::{TEST_LAT_CHICAGO, TEST_LON_CHICAGO};

    #[test]
    fn noon_clear_chicago_elevation() {
        // 2024-06-21 12:00 local, Chicago is UTC-5 (CDT).
        let local_noon = Utc.with_ymd_and_hms(2024, 6, 21, 17, 0, 0).unwrap();
        let pos = solar_position(local_noon, TEST_LAT_CHICAGO, TEST_LON_CHICAGO, -5.0);
        assert!((pos.elevation_degrees - 72.0).abs() < 2.0);
    }

    #[test]
    fn elevation_always_in_range() {
        for lat in [-80.0, -45.0, 0.0, 23.5, 45.0, 66.0] {
            for hour in 0..24 {
                let instant = Utc.with_ymd_and_hms(2024, 3, 15, hour, 0, 0).unwrap();
                let pos = solar_position(instant, lat, -87.63, -6.0);
                assert!(pos.elevation_degrees >= -90.0 && pos.elevation_degrees <= 90.0);
            }
        }
    }

    #[test]
    fn mid_latitude_sunrise_sunset_valid_year_round() {
        for day_of_year in (1..360).step_by(10) {
            let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                + chrono::Duration::days(day_of_year);
            let times = sunrise_sunset(
                date.year(),
                date.month(),
                date.day(),
                TEST_LAT_CHICAGO,
                TEST_LON_CHICAGO,
                -6.0,
            );
            assert!(times.valid, "expected valid sunrise/sunset at day {day_of_year}");
            assert!(times.sunrise < times.sunset);
        }
    }

    #[test]
    fn chicago_summer_solstice_sunrise_sunset_land_on_local_clock() {
        // 2024-06-21, Chicago (CDT, UTC-5). Actual: sunrise ~05:16, sunset ~20:30 local.
        let times = sunrise_sunset(2024, 6, 21, TEST_LAT_CHICAGO, TEST_LON_CHICAGO, -5.0);
        assert!(times.valid);
        let sunrise_local = times.sunrise + chrono::Duration::hours(-5);
        let sunset_local = times.sunset + chrono::Duration::hours(-5);
        assert_eq!(sunrise_local.date_naive(), chrono::NaiveDate::from_ymd_opt(2024, 6, 21).unwrap());
        assert!(sunrise_local.hour() >= 4 && sunrise_local.hour() <= 6, "sunrise hour {}", sunrise_local.hour());
        assert!(sunset_local.hour() >= 19 && sunset_local.hour() <= 21, "sunset hour {}", sunset_local.hour());
    }

    #[test]
    fn polar_region_reports_invalid_in_midsummer() {
        // 75N in midsummer: sun never sets, so zenith 90.833 is unreachable.
        let times = sunrise_sunset(2024, 6, 21, 75.0, 0.0, 0.0);
        assert!(!times.valid);
    }
}
