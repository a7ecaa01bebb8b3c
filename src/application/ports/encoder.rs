//! Streaming encoder port interfaces

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::application::error::RecordingError;
use crate::application::ports::capture::CaptureHandle;
use crate::domain::artifact::AudioMimeType;
use crate::domain::recording::Bitrate;

/// Where an encoder delivers its periodic chunks
pub type ChunkSender = UnboundedSender<Vec<u8>>;

/// Builds encoders bound to an open capture
pub trait EncoderFactory: Send + Sync {
    /// Bind a new encoder to `capture`. The handle stays owned by the caller.
    fn create(
        &self,
        capture: &mut CaptureHandle,
        bitrate: Bitrate,
    ) -> Result<Box<dyn StreamEncoder>, RecordingError>;
}

/// Encoder running over a capture's frames
#[async_trait]
pub trait StreamEncoder: Send {
    fn mime_type(&self) -> AudioMimeType;

    /// Begin encoding, emitting a chunk roughly every `timeslice`
    fn start(&mut self, timeslice: StdDuration, chunks: ChunkSender) -> Result<(), RecordingError>;

    /// Flush remaining data into the chunk sender and wait until the encoder
    /// has finished. There is no timeout.
    async fn finalize(&mut self) -> Result<(), RecordingError>;

    /// Stop without flushing. Buffered data is discarded.
    fn abort(&mut self);
}
