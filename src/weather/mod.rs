//! Weather data model and the two collaborators that produce/consume it:
//! the on-disk cache ([`cache`]) and the async external-process fetcher
//! ([`fetch`]).

pub mod cache;
pub mod fetch;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::constants::REFRESH_WINDOW_MINUTES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    #[serde(default)]
    pub cloud_cover: u32,
    #[serde(default)]
    pub forecast: String,
    #[serde(default)]
    pub temperature_f: f64,
    #[serde(default)]
    pub is_day: bool,
    #[serde(default)]
    pub fetched_at: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_error: bool,
}

impl WeatherData {
    pub fn erroneous() -> Self {
        Self {
            cloud_cover: 0,
            forecast: String::new(),
            temperature_f: 0.0,
            is_day: true,
            fetched_at: 0,
            has_error: true,
        }
    }

    /// Stale when older than the refresh window, erroneous, or never
    /// actually fetched (`fetched_at == 0` from a freshly-created cache).
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        if self.has_error || self.fetched_at == 0 {
            return true;
        }
        let age_minutes = (now.timestamp() - self.fetched_at) as f64 / 60.0;
        age_minutes > REFRESH_WINDOW_MINUTES as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erroneous_cache_is_always_stale() {
        let data = WeatherData::erroneous();
        assert!(data.is_stale(Utc::now()));
    }

    #[test]
    fn fresh_cache_is_not_stale() {
        let now = Utc::now();
        let data = WeatherData {
            cloud_cover: 10,
            forecast: "Sunny".into(),
            temperature_f: 72.0,
            is_day: true,
            fetched_at: now.timestamp(),
            has_error: false,
        };
        assert!(!data.is_stale(now));
    }

    #[test]
    fn old_cache_is_stale() {
        let now = Utc::now();
        let data = WeatherData {
            cloud_cover: 10,
            forecast: "Sunny".into(),
            temperature_f: 72.0,
            is_day: true,
            fetched_at: (now - chrono::Duration::minutes(REFRESH_WINDOW_MINUTES + 1)).timestamp(),
            has_error: false,
        };
        assert!(data.is_stale(now));
    }
}
