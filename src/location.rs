//! `Location` data model and the hand-rolled `config.ini` reader/writer.
//!
//! The format is a single `[location]` section with two keys. A tolerant
//! reader like this is worth hand-rolling (spec §4.5); a TOML/INI crate
//! would be overkill for two floats.

use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub valid: bool,
}

impl Location {
    pub fn invalid() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            valid: false,
        }
    }

    pub fn new(latitude: f64, longitude: f64) -> Self {
        let valid = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
        Self {
            latitude,
            longitude,
            valid,
        }
    }

    /// Parse `"lat,lon"` as two decimal doubles.
    pub fn parse_lat_lon(s: &str) -> Option<Self> {
        let (lat_str, lon_str) = s.split_once(',')?;
        let lat: f64 = lat_str.trim().parse().ok()?;
        let lon: f64 = lon_str.trim().parse().ok()?;
        Some(Self::new(lat, lon))
    }

    /// Read from `config.ini`. Missing file or malformed content is treated
    /// as "no location configured" (spec §7: parse failures never abort).
    pub fn read(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            return Self::invalid();
        };
        Self::parse_ini(&contents)
    }

    fn parse_ini(contents: &str) -> Self {
        let mut latitude: Option<f64> = None;
        let mut longitude: Option<f64> = None;
        let mut in_location_section = false;

        for raw_line in contents.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                in_location_section = line.eq_ignore_ascii_case("[location]");
                continue;
            }
            if !in_location_section {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "latitude" => latitude = value.parse().ok(),
                "longitude" => longitude = value.parse().ok(),
                _ => {}
            }
        }

        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon),
            _ => Self::invalid(),
        }
    }

    /// Write the canonical fixed-order form with six-decimal coordinates.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let contents = format!(
            "[location]\nlatitude = {:.6}\nlongitude = {:.6}\n",
            self.latitude, self.longitude
        );
        fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_lat_lon_string() {
        let loc = Location::parse_lat_lon("41.88,-87.63").unwrap();
        assert!(loc.valid);
        assert!((loc.latitude - 41.88).abs() < 1e-9);
        assert!((loc.longitude - (-87.63)).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let loc = Location::new(95.0, 0.0);
        assert!(!loc.valid);
    }

    #[test]
    fn missing_file_is_invalid_not_an_error() {
        let loc = Location::read(Path::new("/nonexistent/config.ini"));
        assert!(!loc.valid);
    }

    #[test]
    fn tolerant_of_comments_and_blank_lines() {
        let ini = "# a comment\n\n[location]\n; another comment\nlatitude = 41.880000\nlongitude = -87.630000\n";
        let loc = Location::parse_ini(ini);
        assert!(loc.valid);
        assert!((loc.latitude - 41.88).abs() < 1e-9);
    }

    #[test]
    fn round_trip_preserves_coordinates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let original = Location::new(41.88, -87.63);
        original.write(&path).unwrap();
        let read_back = Location::read(&path);
        assert!(read_back.valid);
        assert!((read_back.latitude - original.latitude).abs() < 1e-6);
        assert!((read_back.longitude - original.longitude).abs() < 1e-6);
    }
}
