//! Filesystem locations of the cache and settings documents (XDG-aware).

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

use crate::config::Config;

/// Directory name under the user cache and config roots.
pub const APP_DIR_NAME: &str = "ubuntu-l10n";
pub const CACHE_FILE_NAME: &str = "cache.json";
pub const SETTINGS_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("unable to determine the user's home directory")]
    MissingHomeDir,
}

/// Resolved document locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub cache_file: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    /// Configured paths, falling back to `$XDG_CACHE_HOME/ubuntu-l10n/cache.json`
    /// and `$XDG_CONFIG_HOME/ubuntu-l10n/config.json`.
    pub fn resolve(config: &Config) -> Result<Self, PathError> {
        let cache_file = match &config.cache.path {
            Some(path) => path.clone(),
            None => default_dirs()?
                .cache_dir()
                .join(APP_DIR_NAME)
                .join(CACHE_FILE_NAME),
        };
        let settings_file = match &config.settings.path {
            Some(path) => path.clone(),
            None => default_dirs()?
                .config_dir()
                .join(APP_DIR_NAME)
                .join(SETTINGS_FILE_NAME),
        };
        Ok(Self {
            cache_file,
            settings_file,
        })
    }

    /// Both documents under one directory.
    pub fn under<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            cache_file: root.join(CACHE_FILE_NAME),
            settings_file: root.join(SETTINGS_FILE_NAME),
        }
    }
}

fn default_dirs() -> Result<BaseDirs, PathError> {
    BaseDirs::new().ok_or(PathError::MissingHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_paths_win() {
        let mut config = Config::default();
        config.cache.path = Some(PathBuf::from("/tmp/l10n/c.json"));
        config.settings.path = Some(PathBuf::from("/tmp/l10n/s.json"));

        let paths = AppPaths::resolve(&config).unwrap();

        assert_eq!(paths.cache_file, PathBuf::from("/tmp/l10n/c.json"));
        assert_eq!(paths.settings_file, PathBuf::from("/tmp/l10n/s.json"));
    }

    #[test]
    fn test_defaults_live_under_app_dir() {
        // Skip on hosts without a home directory
        let Ok(paths) = AppPaths::resolve(&Config::default()) else {
            return;
        };
        assert!(paths.cache_file.ends_with("ubuntu-l10n/cache.json"));
        assert!(paths.settings_file.ends_with("ubuntu-l10n/config.json"));
    }

    #[test]
    fn test_under_root() {
        let paths = AppPaths::under("/data");
        assert_eq!(paths.cache_file, PathBuf::from("/data/cache.json"));
        assert_eq!(paths.settings_file, PathBuf::from("/data/config.json"));
    }
}
