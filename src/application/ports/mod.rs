//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod detector;
pub mod encoder;
pub mod status;
pub mod store;

// Re-export common types
pub use capture::{AudioInput, CaptureHandle, CaptureTrack, FrameReceiver, StreamFormat};
pub use config::ConfigStore;
pub use detector::{DetectorEvents, DetectorFactory, SpeechDetector, SpeechEvents};
pub use encoder::{ChunkSender, EncoderFactory, StreamEncoder};
pub use status::{SilentStatus, StatusSink};
pub use store::{ArtifactStore, StoreError};
