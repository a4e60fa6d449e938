//! Integration tests for the CLI↔daemon file protocol (spec §4.8): each
//! command touches only the files under the config directory, never a
//! socket or the display itself (`--reset` aside, which needs a live
//! backend and is exercised manually, not here).

use tempfile::tempdir;

use abraxas::location::Location;
use abraxas::override_state::OverrideState;
use abraxas::paths::Paths;

fn test_paths(config_dir: &std::path::Path) -> Paths {
    Paths {
        config_ini: config_dir.join("config.ini"),
        weather_cache: config_dir.join("weather_cache.json"),
        override_file: config_dir.join("override.json"),
        pid_file: config_dir.join("daemon.pid"),
        zip_table: config_dir.join("us_zipcodes.bin"),
        config_dir: config_dir.to_path_buf(),
    }
}

#[test]
fn set_writes_an_active_override_with_zero_start_temp() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    abraxas::commands::set::run(&paths, 3500, Some(10)).unwrap();

    let ov = OverrideState::read(&paths.override_file).unwrap();
    assert!(ov.active);
    assert_eq!(ov.target_temp, 3500);
    assert_eq!(ov.duration_minutes, 10);
    assert_eq!(ov.start_temp, 0);
}

#[test]
fn set_defaults_duration_to_three_minutes() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    abraxas::commands::set::run(&paths, 5000, None).unwrap();

    let ov = OverrideState::read(&paths.override_file).unwrap();
    assert_eq!(ov.duration_minutes, 3);
}

#[test]
fn resume_removes_the_override_file() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    abraxas::commands::set::run(&paths, 3500, None).unwrap();
    assert!(paths.override_file.exists());

    abraxas::commands::resume::run(&paths).unwrap();
    assert!(!paths.override_file.exists());
}

#[test]
fn resume_on_an_already_absent_override_is_not_an_error() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    abraxas::commands::resume::run(&paths).unwrap();
}

#[test]
fn set_location_accepts_lat_lon_pair() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    abraxas::commands::set_location::run(&paths, "41.88,-87.63").unwrap();

    let location = Location::read(&paths.config_ini);
    assert!(location.valid);
    assert!((location.latitude - 41.88).abs() < 1e-6);
    assert!((location.longitude - (-87.63)).abs() < 1e-6);
}

#[test]
fn set_location_rejects_malformed_lat_lon() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    assert!(abraxas::commands::set_location::run(&paths, "not-a-location").is_err());
}

#[test]
fn set_location_rejects_out_of_range_coordinates() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    assert!(abraxas::commands::set_location::run(&paths, "200,200").is_err());
}

#[test]
fn set_location_rejects_unknown_zip() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();
    // No us_zipcodes.bin present: resolving a ZIP must fail cleanly rather
    // than panic on a missing file.
    assert!(abraxas::commands::set_location::run(&paths, "60601").is_err());
}

#[test]
fn refresh_without_a_configured_location_is_a_user_error() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    assert!(abraxas::commands::refresh::run(&paths).is_err());
}

#[test]
fn override_round_trip_through_the_full_set_resume_cycle() {
    let dir = tempdir().unwrap();
    let paths = test_paths(dir.path());
    paths.ensure_config_dir().unwrap();

    abraxas::commands::set::run(&paths, 2900, Some(0)).unwrap();
    let ov = OverrideState::read(&paths.override_file).unwrap();
    assert_eq!(ov.duration_minutes, 0);

    abraxas::commands::resume::run(&paths).unwrap();
    assert!(OverrideState::read(&paths.override_file).is_none());
}
