//! Config directory and file path resolution.
//!
//! All persisted state lives under `${HOME}/.config/abraxas/`. Spec §4.5: if
//! `$HOME` is unset, path resolution fails outright; the directory is
//! created (mode 0755) idempotently on every startup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::common::constants::CONFIG_DIR_MODE;
use crate::error::AbraxasError;

#[derive(Debug, Clone)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub config_ini: PathBuf,
    pub weather_cache: PathBuf,
    pub override_file: PathBuf,
    pub pid_file: PathBuf,
    pub zip_table: PathBuf,
}

impl Paths {
    pub fn resolve() -> Result<Self, AbraxasError> {
        let home = std::env::var_os("HOME").ok_or(AbraxasError::MissingHome)?;
        let config_dir = Path::new(&home).join(".config").join("abraxas");

        Ok(Self {
            config_ini: config_dir.join("config.ini"),
            weather_cache: config_dir.join("weather_cache.json"),
            override_file: config_dir.join("override.json"),
            pid_file: config_dir.join("daemon.pid"),
            zip_table: config_dir.join("us_zipcodes.bin"),
            config_dir,
        })
    }

    /// Create the config directory if it does not exist, tolerating
    /// `EEXIST`. Mode 0755.
    pub fn ensure_config_dir(&self) -> Result<()> {
        use std::os::unix::fs::DirBuilderExt;

        match std::fs::DirBuilder::new()
            .mode(CONFIG_DIR_MODE)
            .create(&self.config_dir)
        {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!(
                    "failed to create config directory {}",
                    self.config_dir.display()
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(home_env)]
    fn resolve_derives_five_paths_under_home() {
        // SAFETY: serialized against other HOME-mutating tests via #[serial].
        unsafe {
            std::env::set_var("HOME", "/tmp/abraxas-test-home");
        }
        let paths = Paths::resolve().unwrap();
        assert!(paths.config_dir.ends_with(".config/abraxas"));
        assert_eq!(paths.config_ini.file_name().unwrap(), "config.ini");
        assert_eq!(
            paths.weather_cache.file_name().unwrap(),
            "weather_cache.json"
        );
        assert_eq!(paths.override_file.file_name().unwrap(), "override.json");
        assert_eq!(paths.pid_file.file_name().unwrap(), "daemon.pid");
        assert_eq!(paths.zip_table.file_name().unwrap(), "us_zipcodes.bin");
    }

    #[test]
    #[serial(home_env)]
    fn ensure_config_dir_is_idempotent() {
        unsafe {
            std::env::set_var("HOME", "/tmp/abraxas-test-home-2");
        }
        let paths = Paths::resolve().unwrap();
        paths.ensure_config_dir().unwrap();
        paths.ensure_config_dir().unwrap();
        std::fs::remove_dir_all(&paths.config_dir).ok();
    }
}
