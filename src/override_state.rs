//! Manual-override persistence: small JSON object, tolerant reader, fixed
//! canonical writer (spec §4.5).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::constants::MAX_OVERRIDE_FILE_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideState {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub target_temp: u32,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub issued_at: i64,
    #[serde(default)]
    pub start_temp: u32,
}

impl OverrideState {
    /// Read the override file. Absence or any parse failure is treated as
    /// "no override" (`active = false`), never a hard error.
    pub fn read(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        if metadata.len() > MAX_OVERRIDE_FILE_BYTES {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        // Canonical fixed field order, independent of struct declaration order
        // changes, so the on-disk format stays stable across versions.
        let value = serde_json::json!({
            "active": self.active,
            "target_temp": self.target_temp,
            "duration_minutes": self.duration_minutes,
            "issued_at": self.issued_at,
            "start_temp": self.start_temp,
        });
        std::fs::write(path, serde_json::to_string_pretty(&value)?)
    }

    /// Remove the override file; absence is not an error (spec §4.8: resume
    /// clears or deletes, treated identically).
    pub fn clear(path: &Path) -> std::io::Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_preserves_all_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("override.json");
        let original = OverrideState {
            active: true,
            target_temp: 3500,
            duration_minutes: 5,
            issued_at: 1_700_000_000,
            start_temp: 6200,
        };
        original.write(&path).unwrap();
        let read_back = OverrideState::read(&path).unwrap();
        assert_eq!(read_back, original);
    }

    #[test]
    fn missing_fields_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("override.json");
        std::fs::write(&path, r#"{"active": true}"#).unwrap();
        let state = OverrideState::read(&path).unwrap();
        assert_eq!(state.target_temp, 0);
        assert_eq!(state.start_temp, 0);
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("override.json");
        let huge = "x".repeat(MAX_OVERRIDE_FILE_BYTES as usize + 1);
        std::fs::write(&path, huge).unwrap();
        assert!(OverrideState::read(&path).is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("override.json");
        OverrideState::clear(&path).unwrap();
        OverrideState::clear(&path).unwrap();
    }
}
