//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>s, <number>m, or <number>m<number>s (e.g., 30s, 1m, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when a bitrate is not one of the supported values
#[derive(Debug, Clone, Error)]
#[error("Invalid bitrate: \"{input}\". Valid bitrates (kbps) are: 64, 96, 128, 192, 256, 320")]
pub struct BitrateParseError {
    pub input: String,
}

/// Error when an unknown recording mode is requested
#[derive(Debug, Clone, Error)]
#[error("Invalid recording mode: \"{input}\". Valid modes are: manual, vad")]
pub struct InvalidModeError {
    pub input: String,
}

/// Error when a detected speech segment cannot be turned into a WAV artifact
#[derive(Debug, Clone, Error)]
#[error("Failed to encode speech segment: {0}")]
pub struct SegmentEncodeError(pub String);

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
