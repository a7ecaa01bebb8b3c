//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces:
//! cpal capture, WAV encoding, WebRTC speech detection, the XDG config
//! file and on-disk artifact storage.

pub mod config;
pub mod recording;
pub mod status;
pub mod store;

// Re-export adapters
pub use config::XdgConfigStore;
pub use recording::{CpalInput, WavEncoderFactory, WebRtcDetectorFactory};
pub use status::TracingStatus;
pub use store::FileArtifactStore;
