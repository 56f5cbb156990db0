//! Configuration file support for imgmark.
//!
//! Settings are stored as JSON: in the user's config directory on native
//! builds and in localStorage in the browser.

#[cfg(target_arch = "wasm32")]
use imgmark_store::{KeyValueBackend, LocalStorageBackend};
use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_NAME, DEFAULT_NOTIFICATION_MS, DEFAULT_PAGE_SIZE, MIN_DRAFT_HEIGHT, MIN_DRAFT_WIDTH,
};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub editor: EditorConfig,
}

/// General preferences.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory for the file-backed store; platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<std::path::PathBuf>,
}

/// Annotation editor behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Drafts must be strictly wider than this, in intrinsic pixels
    #[serde(default = "default_min_draft_width")]
    pub min_draft_width: f32,

    /// Drafts must be strictly taller than this, in intrinsic pixels
    #[serde(default = "default_min_draft_height")]
    pub min_draft_height: f32,

    /// Hide mutation controls and ignore drawing gestures
    #[serde(default)]
    pub read_only: bool,

    /// Notification lifetime in milliseconds
    #[serde(default = "default_notification_ms")]
    pub notification_ms: u64,

    /// Images per gallery page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_min_draft_width() -> f32 {
    MIN_DRAFT_WIDTH
}

fn default_min_draft_height() -> f32 {
    MIN_DRAFT_HEIGHT
}

fn default_notification_ms() -> u64 {
    DEFAULT_NOTIFICATION_MS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_draft_width: default_min_draft_width(),
            min_draft_height: default_min_draft_height(),
            read_only: false,
            notification_ms: default_notification_ms(),
            page_size: default_page_size(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            editor: EditorConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        if config.editor.min_draft_width < 0.0 || config.editor.min_draft_height < 0.0 {
            return Err(ConfigError::Invalid(
                "minimum draft size must not be negative".to_string(),
            ));
        }
        if config.editor.page_size == 0 {
            return Err(ConfigError::Invalid("page size must be at least 1".to_string()));
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "imgmark-config.json"
    }

    /// Get the default config file path for auto-load/save.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join(APP_NAME).join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join(APP_NAME)
                    .join(Self::default_filename())
            })
        }
    }

    /// Directory for the file-backed store.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn data_dir(&self) -> Option<std::path::PathBuf> {
        self.preferences
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_NAME)))
    }

    /// Load from a file.
    ///
    /// `Ok(None)` means there is no file. A file that exists but cannot be
    /// read or validated is an error, so the caller can report it.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Result<Option<Self>, ConfigError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file found at {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(Some(config))
    }

    /// Load from the default path, if the platform has one.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Result<Option<Self>, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(None),
        }
    }

    /// Write the configuration to `path`, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// LocalStorage key for WASM config persistence.
    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "imgmark-config";

    /// Load from localStorage. `Ok(None)` when nothing was saved yet.
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Result<Option<Self>, ConfigError> {
        let backend = LocalStorageBackend::open()?;
        match backend.get(Self::LOCALSTORAGE_KEY)? {
            Some(json) => {
                let config = Self::from_json(&json)?;
                log::info!("Loaded configuration from localStorage");
                Ok(Some(config))
            }
            None => {
                log::debug!("No config found in localStorage");
                Ok(None)
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        LocalStorageBackend::open()?.set(Self::LOCALSTORAGE_KEY, &self.to_json()?)?;
        log::info!("Saved configuration to localStorage");
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// localStorage could not be reached
    #[error("Storage error: {0}")]
    Storage(#[from] imgmark_store::StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_named_threshold() {
        let config = AppConfig::default();
        assert_eq!(config.editor.min_draft_width, 20.0);
        assert_eq!(config.editor.min_draft_height, 20.0);
        assert!(!config.editor.read_only);
        assert_eq!(config.preferences.log_level, LogLevel::Info);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = AppConfig::from_json(r#"{"version":1,"editor":{"read_only":true}}"#).unwrap();
        assert!(config.editor.read_only);
        assert_eq!(config.editor.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.editor.min_draft_width, MIN_DRAFT_WIDTH);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = AppConfig::from_json(r#"{"version":99}"#).unwrap_err();
        assert!(matches!(err, ConfigError::VersionTooNew { file_version: 99, .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = AppConfig::from_json(r#"{"version":1,"editor":{"page_size":0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_log_level_names() {
        let config =
            AppConfig::from_json(r#"{"version":1,"preferences":{"log_level":"debug"}}"#).unwrap();
        assert_eq!(
            config.preferences.log_level.to_level_filter(),
            log::LevelFilter::Debug
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_save_and_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(AppConfig::default_filename());

        let mut config = AppConfig::default();
        config.editor.min_draft_width = 8.0;
        config.save_to_path(&path).unwrap();

        assert_eq!(AppConfig::load_from_path(&path).unwrap(), Some(config));
        let missing = AppConfig::load_from_path(&dir.path().join("missing.json")).unwrap();
        assert_eq!(missing, None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_unusable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AppConfig::default_filename());

        std::fs::write(&path, r#"{"version": 99}"#).unwrap();
        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::VersionTooNew { .. }));

        std::fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));

        // A directory where the file should be cannot be read.
        let err = AppConfig::load_from_path(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
