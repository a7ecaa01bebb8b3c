//! Speech detection port interfaces

use std::sync::Arc;

use crate::application::error::RecordingError;
use crate::application::ports::capture::CaptureHandle;
use crate::domain::artifact::{RecordingArtifact, SpeechSegment};

/// Boundaries reported by a detector. Called from the detector's own thread.
pub trait DetectorEvents: Send + Sync {
    fn speech_start(&self);
    fn speech_end(&self, segment: SpeechSegment);
    /// Speech was declared but turned out too short to keep
    fn misfire(&self);
}

/// Builds detectors bound to an open capture
pub trait DetectorFactory: Send + Sync {
    fn create(
        &self,
        capture: &mut CaptureHandle,
        events: Arc<dyn DetectorEvents>,
    ) -> Result<Box<dyn SpeechDetector>, RecordingError>;
}

pub trait SpeechDetector: Send {
    fn start(&mut self) -> Result<(), RecordingError>;

    /// Stop detecting. May block until the detector's worker has exited.
    ///
    /// Speech still in progress is returned as a final segment when it is
    /// long enough to keep; otherwise it is discarded.
    fn destroy(&mut self) -> Result<Option<SpeechSegment>, RecordingError>;
}

/// Receiver of a voice activated session's speech boundaries
pub trait SpeechEvents: Send + Sync {
    fn on_speech_start(&self);

    /// One finished segment. May fire many times per session.
    fn on_speech_end(&self, artifact: RecordingArtifact);

    fn on_misfire(&self) {}
}
