//! Audio input port interfaces

use std::fmt;
use std::sync::mpsc::Receiver;

use async_trait::async_trait;
use tracing::warn;

use crate::application::error::{AcquisitionError, CaptureError};
use crate::domain::device::Device;

/// Mono `f32` sample blocks delivered by an open track
pub type FrameReceiver = Receiver<Vec<f32>>;

/// Shape of the samples a track delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Samples per second of the (already downmixed) mono stream
    pub sample_rate: u32,
}

/// Platform side of an open capture.
/// `stop` must be safe to call more than once.
pub trait CaptureTrack: Send {
    fn format(&self) -> StreamFormat;

    /// Hand out the frame stream. Returns `None` once it has been taken.
    fn take_frames(&mut self) -> Option<FrameReceiver>;

    /// Stop the hardware track
    fn stop(&mut self);
}

/// Port for the platform audio-input API
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Ask the platform for microphone access. May show an OS prompt.
    async fn request_permission(&self) -> Result<(), AcquisitionError>;

    /// List input-kind devices in platform order
    async fn list_devices(&self) -> Result<Vec<Device>, AcquisitionError>;

    /// Open a capture bound to exactly `device_id`, or to the platform
    /// default input when `None`.
    async fn open(&self, device_id: Option<&str>) -> Result<CaptureHandle, AcquisitionError>;
}

/// Exclusively owned, open capture on one device.
///
/// Released exactly once. After release every operation fails with
/// [`CaptureError::Released`]. A handle dropped while still open stops its
/// track on drop.
pub struct CaptureHandle {
    device_id: String,
    format: StreamFormat,
    track: Option<Box<dyn CaptureTrack>>,
}

impl CaptureHandle {
    pub fn new(device_id: impl Into<String>, track: Box<dyn CaptureTrack>) -> Self {
        let format = track.format();
        Self {
            device_id: device_id.into(),
            format,
            track: Some(track),
        }
    }

    /// Device the handle was bound to at acquisition time
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn is_released(&self) -> bool {
        self.track.is_none()
    }

    pub fn format(&self) -> Result<StreamFormat, CaptureError> {
        if self.is_released() {
            return Err(CaptureError::Released(self.device_id.clone()));
        }
        Ok(self.format)
    }

    /// Take the frame stream. Only one consumer may read from a handle.
    pub fn take_frames(&mut self) -> Result<FrameReceiver, CaptureError> {
        let track = self
            .track
            .as_mut()
            .ok_or_else(|| CaptureError::Released(self.device_id.clone()))?;
        track
            .take_frames()
            .ok_or_else(|| CaptureError::AlreadySubscribed(self.device_id.clone()))
    }

    /// Stop the hardware track. A second call is an error.
    pub fn release(&mut self) -> Result<(), CaptureError> {
        let mut track = self
            .track
            .take()
            .ok_or_else(|| CaptureError::Released(self.device_id.clone()))?;
        track.stop();
        Ok(())
    }
}

impl fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("device_id", &self.device_id)
            .field("format", &self.format)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        if let Some(mut track) = self.track.take() {
            warn!(device = %self.device_id, "Capture handle dropped without release, stopping track");
            track.stop();
        }
    }
}
