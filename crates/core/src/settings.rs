//! User settings document (`config.json`).
//!
//! Absent or corrupt documents load as defaults. Keys this version does not
//! know are carried through every rewrite.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key of the first-run-completed flag.
pub const FIRST_RUN_KEY: &str = "first_run_done";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(String),

    #[error("Failed to encode settings: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether the welcome screen has been dismissed.
    #[serde(default)]
    pub first_run_done: bool,
    /// Whether to announce poorly translated packages after a load.
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_run_done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
}

impl Settings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(done) = patch.first_run_done {
            self.first_run_done = done;
        }
        if let Some(enabled) = patch.notifications_enabled {
            self.notifications_enabled = enabled;
        }
    }

    /// Best-effort typed view of an arbitrary JSON object. Known keys with
    /// the wrong type fall back to their defaults.
    fn from_object(mut object: Map<String, Value>) -> Self {
        let mut flag = |key: &str| match object.remove(key) {
            Some(Value::Bool(b)) => b,
            Some(other) => {
                debug!(key, value = %other, "Ignoring non-boolean setting");
                false
            }
            None => false,
        };
        let first_run_done = flag(FIRST_RUN_KEY);
        let notifications_enabled = flag("notifications_enabled");
        Self {
            first_run_done,
            notifications_enabled,
            extra: object,
        }
    }
}

/// Reads and writes the settings document.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Settings, SettingsError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let _guard = self.lock.lock().await;
        self.write(settings).await
    }

    /// Read-modify-write under the store lock; returns the stored result.
    pub async fn update(&self, patch: &SettingsPatch) -> Result<Settings, SettingsError> {
        let _guard = self.lock.lock().await;
        let mut settings = self.read().await?;
        settings.apply(patch);
        self.write(&settings).await?;
        Ok(settings)
    }

    async fn read(&self) -> Result<Settings, SettingsError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => {
                return Err(SettingsError::Io(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_slice::<Map<String, Value>>(&bytes) {
            Ok(object) => Ok(Settings::from_object(object)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Settings document is corrupt, using defaults");
                Ok(Settings::default())
            }
        }
    }

    async fn write(&self, settings: &Settings) -> Result<(), SettingsError> {
        let encoded =
            serde_json::to_vec_pretty(settings).map_err(|e| SettingsError::Encode(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                SettingsError::Io(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, encoded).await.map_err(|e| {
            SettingsError::Io(format!("failed to write {}: {}", temp_path.display(), e))
        })?;
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            SettingsError::Io(format!("failed to replace {}: {}", self.path.display(), e))
        })
    }
}
