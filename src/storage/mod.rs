//! Persistent application settings.

pub mod config;

pub use config::{
    AnalysisSettings, AppConfig, CacheSettings, ConfigError, LoggingSettings, SourceKind,
    SourceSettings,
};
