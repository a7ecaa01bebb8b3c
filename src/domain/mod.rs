//! Domain layer - Core value objects
//!
//! Contains devices, artifacts, session states and domain errors.
//! This layer has no dependencies on external systems.

pub mod artifact;
pub mod config;
pub mod device;
pub mod error;
pub mod recording;
pub mod status;

// Re-export common types
pub use artifact::{AudioMimeType, RecordingArtifact, SpeechSegment};
pub use config::AppConfig;
pub use device::{Device, DeviceAcquisitionOutcome, FallbackReason};
pub use error::*;
pub use recording::{
    Bitrate, CancelOutcome, Duration, RecordingMode, SessionState, VadState, VadTuning,
};
pub use status::StatusUpdate;
