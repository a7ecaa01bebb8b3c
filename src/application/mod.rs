//! Application layer - Recording core and port interfaces
//!
//! Contains device acquisition, the recording modes, the coordinator that
//! keeps them mutually exclusive, and the trait definitions for platform
//! interactions.

pub mod acquisition;
pub mod coordinator;
pub mod error;
pub mod manual;
pub mod ports;
pub mod service;
pub mod vad;

#[cfg(test)]
pub(crate) mod fakes;

// Re-export the core
pub use acquisition::{AcquiredCapture, CaptureAcquisition, DeviceDirectory};
pub use coordinator::{ModeCoordinator, ModeStopFailure, RegisteredMode, SwitchReport};
pub use error::{AcquisitionError, CaptureError, RecordingError};
pub use manual::{ManualRecorder, TIMESLICE};
pub use service::{RecordingService, StartOverrides};
pub use vad::VoiceActivitySegmenter;
