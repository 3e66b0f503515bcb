use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::acquisition::MAX_UPLOAD_BYTES;
use crate::notification::DEFAULT_DISPLAY_DURATION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "snaptext";
const APP_CONFIG_FILE: &str = "config.json";

/// What to tell the user when an image is rejected at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionFeedback {
    #[default]
    Silent,
    Notify,
}

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ocr_language: Option<String>,
    #[serde(default)]
    pub toast_duration_ms: Option<u64>,
    #[serde(default)]
    pub max_upload_bytes: Option<u64>,
    #[serde(default)]
    pub rejection_feedback: RejectionFeedback,
    #[serde(default)]
    pub desktop_notifications: bool,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn toast_duration(&self) -> Duration {
        self.toast_duration_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DISPLAY_DURATION)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
            .filter(|bytes| *bytes > 0)
            .unwrap_or(MAX_UPLOAD_BYTES)
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = match xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        Some(xdg) => xdg.to_path_buf(),
        None => home
            .ok_or(ConfigPathError::MissingHomeDirectory)?
            .join(".config"),
    };
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}
