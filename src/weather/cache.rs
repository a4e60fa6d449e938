//! `weather_cache.json` reader/writer.
//!
//! Same tolerant-read/canonical-write treatment as [`crate::override_state`]:
//! malformed or oversized files are "erroneous", never a hard error.

use std::path::Path;

use super::WeatherData;
use crate::common::constants::MAX_WEATHER_FILE_BYTES;

/// Read the cache. A missing file, malformed JSON, or a too-large file all
/// yield the erroneous sentinel rather than failing.
pub fn read(path: &Path) -> WeatherData {
    let Ok(metadata) = std::fs::metadata(path) else {
        return WeatherData::erroneous();
    };
    if metadata.len() > MAX_WEATHER_FILE_BYTES {
        return WeatherData::erroneous();
    }
    let Ok(contents) = std::fs::read_to_string(path) else {
        return WeatherData::erroneous();
    };
    // Presence of an `error` key marks the cache erroneous regardless of
    // what other fields parsed.
    if let Ok(raw) = serde_json::from_str::<serde_json::Value>(&contents)
        && raw.get("error").is_some()
    {
        return WeatherData::erroneous();
    }
    serde_json::from_str(&contents).unwrap_or_else(|_| WeatherData::erroneous())
}

pub fn write(path: &Path, data: &WeatherData) -> std::io::Result<()> {
    let mut value = serde_json::json!({
        "cloud_cover": data.cloud_cover,
        "forecast": data.forecast,
        "temperature": data.temperature_f,
        "is_day": data.is_day,
        "fetched_at": data.fetched_at,
    });
    if data.has_error {
        value["error"] = serde_json::Value::Bool(true);
    }
    std::fs::write(path, serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_preserves_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weather_cache.json");
        let data = WeatherData {
            cloud_cover: 42,
            forecast: "Partly Cloudy".into(),
            temperature_f: 68.5,
            is_day: true,
            fetched_at: 1_700_000_000,
            has_error: false,
        };
        write(&path, &data).unwrap();
        let read_back = read(&path);
        assert_eq!(read_back.cloud_cover, data.cloud_cover);
        assert_eq!(read_back.forecast, data.forecast);
        assert_eq!(read_back.temperature_f, data.temperature_f);
        assert_eq!(read_back.fetched_at, data.fetched_at);
        assert!(!read_back.has_error);
    }

    #[test]
    fn error_key_marks_erroneous_on_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weather_cache.json");
        std::fs::write(&path, r#"{"error": true, "cloud_cover": 0}"#).unwrap();
        assert!(read(&path).has_error);
    }

    #[test]
    fn missing_file_is_erroneous() {
        let data = read(Path::new("/nonexistent/weather_cache.json"));
        assert!(data.has_error);
    }

    #[test]
    fn zero_fetched_at_is_treated_as_erroneous_by_caller() {
        let data = WeatherData::erroneous();
        assert_eq!(data.fetched_at, 0);
        assert!(data.is_stale(chrono::Utc::now()));
    }
}
