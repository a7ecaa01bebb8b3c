//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Environment variable that overrides the configured device
pub const DEVICE_ENV: &str = "SCRIBE_CAPTURE_DEVICE";

/// scribe-capture - microphone capture with device fallback
#[derive(Parser, Debug)]
#[command(name = "scribe-capture")]
#[command(version)]
#[command(about = "Record from the microphone manually or by voice activity")]
#[command(long_about = None)]
pub struct Cli {
    /// Show debug logs (overridden by SCRIBE_CAPTURE_LOG)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List audio input devices
    Devices {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record until Ctrl+C or until the duration elapses
    Record(RecordArgs),
    /// Save one file per detected speech segment until Ctrl+C
    Listen(ListenArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RecordArgs {
    /// Input device id (see `devices`)
    #[arg(short = 'd', long, value_name = "ID", env = DEVICE_ENV)]
    pub device: Option<String>,

    /// Bitrate in kbps (64, 96, 128, 192, 256, 320)
    #[arg(short = 'b', long, value_name = "KBPS")]
    pub bitrate: Option<String>,

    /// Stop after this long (e.g. 30s, 2m30s)
    #[arg(short = 't', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// Directory to write the recording to
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListenArgs {
    /// Input device id (see `devices`)
    #[arg(short = 'd', long, value_name = "ID", env = DEVICE_ENV)]
    pub device: Option<String>,

    /// Stop listening after this long
    #[arg(short = 't', long, value_name = "TIME")]
    pub max_duration: Option<String>,

    /// Directory to write speech segments to
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// Remove a config value
    Unset {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "device_id",
    "bitrate_kbps",
    "output_dir",
    "max_duration",
    "vad.aggressiveness",
    "vad.onset_ms",
    "vad.redemption_ms",
    "vad.min_speech_ms",
    "vad.pre_speech_pad_ms",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
