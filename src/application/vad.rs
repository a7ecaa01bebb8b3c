//! Voice activated recording session

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::application::acquisition::{
    release_off_runtime, release_quietly, AcquiredCapture, CaptureAcquisition,
};
use crate::application::error::RecordingError;
use crate::application::ports::{
    AudioInput, CaptureHandle, DetectorEvents, DetectorFactory, SpeechDetector, SpeechEvents,
    StatusSink,
};
use crate::domain::artifact::SpeechSegment;
use crate::domain::device::DeviceAcquisitionOutcome;
use crate::domain::recording::VadState;

struct VadSession {
    handle: CaptureHandle,
    detector: Box<dyn SpeechDetector>,
    bridge: Arc<SessionEvents>,
}

#[derive(Default)]
struct VadInner {
    state: VadState,
    /// Bumped on every start and stop; detector events carry the value they
    /// were created with and are ignored once it no longer matches.
    generation: u64,
    starting: bool,
    session: Option<VadSession>,
}

/// Clears the `starting` flag if a start does not commit
struct StartingGuard<'a> {
    inner: &'a Mutex<VadInner>,
    committed: bool,
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.inner.lock().starting = false;
        }
    }
}

/// Bridges detector boundaries to the caller's [`SpeechEvents`], keeping the
/// session state in step.
struct SessionEvents {
    inner: Weak<Mutex<VadInner>>,
    generation: u64,
    events: Arc<dyn SpeechEvents>,
}

impl SessionEvents {
    /// Move to `next` if this detector still belongs to the live session
    fn transition(&self, next: VadState) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut inner = inner.lock();
        if inner.generation != self.generation || !inner.state.is_active() {
            return false;
        }
        inner.state = next;
        true
    }

    /// Encode a finished segment and hand it to the caller
    fn deliver(&self, segment: SpeechSegment) {
        let duration_ms = segment.duration_ms();
        match segment.into_artifact() {
            Ok(artifact) => {
                info!(duration_ms, size = %artifact.human_readable_size(), "Speech segment captured");
                self.events.on_speech_end(artifact);
            }
            Err(e) => warn!(error = %e, "Discarding speech segment"),
        }
    }
}

/// Destroy the detector and release the handle on the blocking pool; both
/// may join platform threads.
async fn teardown(
    mut detector: Box<dyn SpeechDetector>,
    mut handle: CaptureHandle,
) -> Result<Option<SpeechSegment>, RecordingError> {
    tokio::task::spawn_blocking(move || {
        let destroyed = detector.destroy();
        release_quietly(&mut handle);
        destroyed
    })
    .await
    .unwrap_or_else(|e| {
        Err(RecordingError::DetectorTeardownFailed(format!(
            "Teardown task error: {}",
            e
        )))
    })
}

impl DetectorEvents for SessionEvents {
    fn speech_start(&self) {
        if self.transition(VadState::SpeechDetected) {
            debug!("Speech detected");
            self.events.on_speech_start();
        }
    }

    fn speech_end(&self, segment: SpeechSegment) {
        if !self.transition(VadState::Listening) {
            debug!("Dropping speech segment from a stopped session");
            return;
        }
        self.deliver(segment);
    }

    fn misfire(&self) {
        if self.transition(VadState::Listening) {
            debug!("Speech misfire");
            self.events.on_misfire();
        }
    }
}

/// Continuous voice activated capture.
///
/// One capture handle is held from `start` until `stop`; every detected
/// speech segment is handed to [`SpeechEvents::on_speech_end`] without
/// reacquiring the device.
pub struct VoiceActivitySegmenter<I: AudioInput, D: DetectorFactory> {
    acquisition: CaptureAcquisition<I>,
    detectors: D,
    inner: Arc<Mutex<VadInner>>,
}

impl<I: AudioInput, D: DetectorFactory> VoiceActivitySegmenter<I, D> {
    pub fn new(acquisition: CaptureAcquisition<I>, detectors: D) -> Self {
        Self {
            acquisition,
            detectors,
            inner: Arc::new(Mutex::new(VadInner::default())),
        }
    }

    pub fn state(&self) -> VadState {
        self.inner.lock().state
    }

    /// Acquire a device and begin listening for speech.
    ///
    /// Fails with [`RecordingError::AlreadyActive`] unless idle.
    pub async fn start(
        &self,
        device_id: Option<&str>,
        events: Arc<dyn SpeechEvents>,
        status: &dyn StatusSink,
    ) -> Result<DeviceAcquisitionOutcome, RecordingError> {
        let generation = {
            let mut inner = self.inner.lock();
            if inner.state.is_active() || inner.starting {
                return Err(RecordingError::AlreadyActive);
            }
            inner.starting = true;
            inner.generation += 1;
            inner.generation
        };
        let mut guard = StartingGuard {
            inner: &self.inner,
            committed: false,
        };

        let AcquiredCapture { mut handle, outcome } =
            self.acquisition.acquire(device_id, status).await?;

        let bridge = Arc::new(SessionEvents {
            inner: Arc::downgrade(&self.inner),
            generation,
            events,
        });

        let mut detector = match self
            .detectors
            .create(&mut handle, Arc::clone(&bridge) as Arc<dyn DetectorEvents>)
        {
            Ok(detector) => detector,
            Err(e) => {
                warn!(device = handle.device_id(), error = %e, "Speech detector setup failed");
                release_off_runtime(handle).await;
                return Err(e);
            }
        };

        // Detector events lock `inner`, so anything the detector reports
        // while starting is applied after the session is committed.
        let failed = {
            let mut inner = self.inner.lock();
            match detector.start() {
                Ok(()) => {
                    info!(device = handle.device_id(), "Listening for speech");
                    inner.state = VadState::Listening;
                    inner.starting = false;
                    inner.session = Some(VadSession {
                        handle,
                        detector,
                        bridge,
                    });
                    guard.committed = true;
                    None
                }
                Err(e) => Some((e, detector, handle)),
            }
        };

        if let Some((e, detector, handle)) = failed {
            warn!(device = handle.device_id(), error = %e, "Speech detector failed to start");
            if let Err(teardown) = teardown(detector, handle).await {
                debug!(error = %teardown, "Ignoring teardown failure after failed start");
            }
            return Err(e);
        }

        Ok(outcome)
    }

    /// Stop listening. Succeeds trivially when idle.
    ///
    /// Speech still in progress is delivered to
    /// [`SpeechEvents::on_speech_end`] as a final segment when the detector
    /// keeps it. The handle is released even if the detector fails to shut
    /// down; that failure is returned afterwards.
    pub async fn stop(&self) -> Result<(), RecordingError> {
        let session = {
            let mut inner = self.inner.lock();
            let session = inner.session.take();
            if session.is_some() {
                inner.generation += 1;
                inner.state = VadState::Idle;
            }
            session
        };

        let Some(VadSession {
            handle,
            detector,
            bridge,
        }) = session
        else {
            return Ok(());
        };
        let device = handle.device_id().to_string();

        // The generation is already bumped, so the bridge's own callbacks
        // are closed; the final segment comes back from the teardown.
        let destroyed = teardown(detector, handle).await;
        info!(device = %device, "Stopped listening");

        match destroyed {
            Ok(Some(segment)) => {
                debug!("Delivering speech that was in progress at stop");
                bridge.deliver(segment);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Speech detector did not shut down cleanly");
                Err(e)
            }
        }
    }
}
