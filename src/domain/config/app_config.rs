//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::recording::{Bitrate, Duration, VadTuning};

/// `[vad]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VadConfig {
    pub aggressiveness: Option<u8>,
    pub onset_ms: Option<u32>,
    pub redemption_ms: Option<u32>,
    pub min_speech_ms: Option<u32>,
    pub pre_speech_pad_ms: Option<u32>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub device_id: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub output_dir: Option<String>,
    pub max_duration: Option<String>,
    pub vad: Option<VadConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        let tuning = VadTuning::default();
        Self {
            device_id: None,
            bitrate_kbps: Some(Bitrate::default().kbps()),
            output_dir: None,
            max_duration: Some(Duration::default_max_duration().to_string()),
            vad: Some(VadConfig {
                aggressiveness: Some(tuning.aggressiveness),
                onset_ms: Some(tuning.onset_ms),
                redemption_ms: Some(tuning.redemption_ms),
                min_speech_ms: Some(tuning.min_speech_ms),
                pre_speech_pad_ms: Some(tuning.pre_speech_pad_ms),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            device_id: other.device_id.or(self.device_id),
            bitrate_kbps: other.bitrate_kbps.or(self.bitrate_kbps),
            output_dir: other.output_dir.or(self.output_dir),
            max_duration: other.max_duration.or(self.max_duration),
            vad: Self::merge_vad_config(self.vad, other.vad),
        }
    }

    fn merge_vad_config(base: Option<VadConfig>, other: Option<VadConfig>) -> Option<VadConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(VadConfig {
                aggressiveness: o.aggressiveness.or(b.aggressiveness),
                onset_ms: o.onset_ms.or(b.onset_ms),
                redemption_ms: o.redemption_ms.or(b.redemption_ms),
                min_speech_ms: o.min_speech_ms.or(b.min_speech_ms),
                pre_speech_pad_ms: o.pre_speech_pad_ms.or(b.pre_speech_pad_ms),
            }),
        }
    }

    /// Configured device, treating an empty string as unset
    pub fn preferred_device(&self) -> Option<&str> {
        self.device_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Get bitrate, or default if not set/unsupported
    pub fn bitrate_or_default(&self) -> Bitrate {
        self.bitrate_kbps
            .and_then(|kbps| Bitrate::from_kbps(kbps).ok())
            .unwrap_or_default()
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    /// Output directory, if one is configured
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Speech detector tuning with defaults for unset fields.
    /// Aggressiveness above the supported range is clamped.
    pub fn vad_tuning(&self) -> VadTuning {
        let defaults = VadTuning::default();
        let Some(vad) = self.vad.as_ref() else {
            return defaults;
        };

        VadTuning {
            aggressiveness: vad
                .aggressiveness
                .unwrap_or(defaults.aggressiveness)
                .min(VadTuning::MAX_AGGRESSIVENESS),
            onset_ms: vad.onset_ms.unwrap_or(defaults.onset_ms),
            redemption_ms: vad.redemption_ms.unwrap_or(defaults.redemption_ms),
            min_speech_ms: vad.min_speech_ms.unwrap_or(defaults.min_speech_ms),
            pre_speech_pad_ms: vad.pre_speech_pad_ms.unwrap_or(defaults.pre_speech_pad_ms),
        }
    }
}
