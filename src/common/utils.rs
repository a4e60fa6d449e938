//! Small free-standing helpers used across the daemon and CLI.

use chrono::{DateTime, Utc};

/// Clamp a Kelvin temperature to the spec's `[TEMP_MIN, TEMP_MAX]` range.
pub fn clamp_temp(temp: i64) -> u32 {
    temp.clamp(
        super::constants::TEMP_MIN as i64,
        super::constants::TEMP_MAX as i64,
    ) as u32
}

/// Minutes elapsed between two instants, `b - a`, as a signed float.
pub fn minutes_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (b - a).num_milliseconds() as f64 / 60_000.0
}

/// Convert a file path to a privacy-friendly format using tilde notation.
///
/// Replaces the user's home directory path with `~` so log lines and error
/// messages don't leak the full home directory.
pub fn private_path(path: &std::path::Path) -> String {
    if let Some(home_dir) = dirs::home_dir()
        && let Ok(relative_path) = path.strip_prefix(&home_dir)
    {
        return format!("~/{}", relative_path.display());
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_temp_respects_bounds() {
        assert_eq!(clamp_temp(0), super::super::constants::TEMP_MIN);
        assert_eq!(clamp_temp(100_000), super::super::constants::TEMP_MAX);
        assert_eq!(clamp_temp(6500), 6500);
    }

    #[test]
    fn minutes_between_is_signed() {
        let a = DateTime::parse_from_rfc3339("2024-06-21T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = a + chrono::Duration::minutes(30);
        assert!((minutes_between(a, b) - 30.0).abs() < 1e-9);
        assert!((minutes_between(b, a) + 30.0).abs() < 1e-9);
    }
}
