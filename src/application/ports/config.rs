//! Settings port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Port for the settings collaborator.
///
/// Supplies the preferred device and bitrate to each recording start and
/// remembers a new default device after a fallback.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load stored settings. A missing file yields an empty config.
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Replace stored settings with `config`
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    /// Location of the settings file
    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Write a settings file populated with defaults.
    /// Fails with [`ConfigError::AlreadyExists`] if one is present.
    async fn init(&self) -> Result<(), ConfigError>;
}
