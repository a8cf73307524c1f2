//! Application configuration.
//!
//! Stored as TOML under the platform data directory. A missing file yields
//! the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::{InstallPolicy, ReferenceZone, DEFAULT_UTC_OFFSET_MINUTES};

/// Which biometric source to read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Deterministic demo records (default)
    #[default]
    Mock,
    /// Platform health store
    Device,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Mock => write!(f, "mock"),
            SourceKind::Device => write!(f, "device"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Biometric source settings
    pub source: SourceSettings,
    /// Analysis service settings
    pub analysis: AnalysisSettings,
    /// Score cache settings
    pub cache: CacheSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Biometric source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: SourceKind,
    /// JSON sample export read by the device source
    pub samples_path: Option<PathBuf>,
    /// User id sent with uploads
    pub user_id: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Mock,
            samples_path: None,
            user_id: "user_001".to_string(),
        }
    }
}

/// Analysis service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Service base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Score cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Offset of the reference timezone from UTC, in minutes
    pub utc_offset_minutes: i32,
    pub install_policy: InstallPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            install_policy: InstallPolicy::default(),
        }
    }
}

impl CacheSettings {
    pub fn reference_zone(&self) -> ReferenceZone {
        ReferenceZone::from_offset_minutes(self.utc_offset_minutes)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "bioscope", "Bioscope")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_from(&get_config_path())
}

/// Load application configuration from `path`.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_to(config, &get_config_path())
}

/// Save application configuration to `path`.
pub fn save_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
