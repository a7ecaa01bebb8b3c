//! Push-button recording session

use std::time::{Duration as StdDuration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::application::acquisition::{release_off_runtime, AcquiredCapture, CaptureAcquisition};
use crate::application::error::RecordingError;
use crate::application::ports::{
    AudioInput, CaptureHandle, EncoderFactory, StatusSink, StreamEncoder,
};
use crate::domain::artifact::RecordingArtifact;
use crate::domain::device::DeviceAcquisitionOutcome;
use crate::domain::recording::{Bitrate, CancelOutcome, SessionState};
use crate::domain::status::StatusUpdate;

/// Interval at which the encoder hands over buffered data
pub const TIMESLICE: StdDuration = StdDuration::from_millis(1000);

struct ActiveRecording {
    handle: CaptureHandle,
    encoder: Box<dyn StreamEncoder>,
    chunks: UnboundedReceiver<Vec<u8>>,
    bitrate: Bitrate,
    started_at: Instant,
}

enum Slot {
    Idle,
    /// A start is acquiring its device
    Starting,
    Recording(Box<ActiveRecording>),
}

/// Holds the `Starting` slot until the start commits.
/// Dropping it uncommitted puts the slot back to `Idle`.
struct StartReservation<'a> {
    slot: &'a Mutex<Slot>,
    committed: bool,
}

impl StartReservation<'_> {
    fn commit(mut self, active: ActiveRecording) {
        *self.slot.lock() = Slot::Recording(Box::new(active));
        self.committed = true;
    }
}

impl Drop for StartReservation<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Starting) {
            *slot = Slot::Idle;
        }
    }
}

/// Manual recording mode.
///
/// At most one session exists at a time. `stop` and `cancel` detach the
/// session synchronously before any await, so a concurrent second call sees
/// `Idle` instead of touching the same handle.
pub struct ManualRecorder<I: AudioInput, E: EncoderFactory> {
    acquisition: CaptureAcquisition<I>,
    encoders: E,
    slot: Mutex<Slot>,
}

impl<I: AudioInput, E: EncoderFactory> ManualRecorder<I, E> {
    pub fn new(acquisition: CaptureAcquisition<I>, encoders: E) -> Self {
        Self {
            acquisition,
            encoders,
            slot: Mutex::new(Slot::Idle),
        }
    }

    pub fn state(&self) -> SessionState {
        match *self.slot.lock() {
            Slot::Recording(_) => SessionState::Recording,
            Slot::Idle | Slot::Starting => SessionState::Idle,
        }
    }

    /// Time since the running session started
    pub fn elapsed(&self) -> Option<StdDuration> {
        match &*self.slot.lock() {
            Slot::Recording(active) => Some(active.started_at.elapsed()),
            _ => None,
        }
    }

    /// Bitrate of the running session
    pub fn bitrate(&self) -> Option<Bitrate> {
        match &*self.slot.lock() {
            Slot::Recording(active) => Some(active.bitrate),
            _ => None,
        }
    }

    fn reserve(&self) -> Result<StartReservation<'_>, RecordingError> {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Idle) {
            return Err(RecordingError::AlreadyRecording);
        }
        *slot = Slot::Starting;
        Ok(StartReservation {
            slot: &self.slot,
            committed: false,
        })
    }

    fn take_active(&self) -> Option<Box<ActiveRecording>> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Recording(active) => Some(active),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Acquire a device, bind an encoder at `bitrate` and start buffering.
    ///
    /// Fails with [`RecordingError::AlreadyRecording`] while another session
    /// is running or starting. The acquired handle is released on every
    /// failure after acquisition.
    pub async fn start(
        &self,
        device_id: Option<&str>,
        bitrate: Bitrate,
        status: &dyn StatusSink,
    ) -> Result<DeviceAcquisitionOutcome, RecordingError> {
        let reservation = self.reserve()?;

        status.on_status(StatusUpdate::new(
            "Starting Recording",
            "Setting up your microphone...",
        ));

        let AcquiredCapture { mut handle, outcome } =
            self.acquisition.acquire(device_id, status).await?;

        let mut encoder = match self.encoders.create(&mut handle, bitrate) {
            Ok(encoder) => encoder,
            Err(e) => {
                warn!(device = handle.device_id(), error = %e, "Encoder setup failed");
                release_off_runtime(handle).await;
                return Err(e);
            }
        };

        let (chunk_tx, chunk_rx) = unbounded_channel();
        if let Err(e) = encoder.start(TIMESLICE, chunk_tx) {
            warn!(device = handle.device_id(), error = %e, "Encoder failed to start");
            encoder.abort();
            drop(encoder);
            release_off_runtime(handle).await;
            return Err(e);
        }

        info!(device = handle.device_id(), %bitrate, "Manual recording started");
        reservation.commit(ActiveRecording {
            handle,
            encoder,
            chunks: chunk_rx,
            bitrate,
            started_at: Instant::now(),
        });

        Ok(outcome)
    }

    /// Finalize the encoder and return everything recorded.
    ///
    /// The handle is released whether or not finalizing succeeds. The await
    /// on the encoder has no timeout.
    pub async fn stop(&self, status: &dyn StatusSink) -> Result<RecordingArtifact, RecordingError> {
        let active = self.take_active().ok_or(RecordingError::NothingToStop)?;
        let ActiveRecording {
            handle,
            mut encoder,
            mut chunks,
            started_at,
            ..
        } = *active;
        let device = handle.device_id().to_string();

        status.on_status(StatusUpdate::new("Finishing Recording", "Saving your audio..."));

        let finalized = encoder.finalize().await;
        release_off_runtime(handle).await;
        if let Err(e) = finalized {
            warn!(device = %device, error = %e, "Recording could not be finalized");
            return Err(e);
        }

        let mut data = Vec::new();
        while let Ok(chunk) = chunks.try_recv() {
            if !chunk.is_empty() {
                data.push(chunk);
            }
        }
        let artifact = RecordingArtifact::from_chunks(data, encoder.mime_type());

        info!(
            device = %device,
            size = %artifact.human_readable_size(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Manual recording finished"
        );
        status.on_status(StatusUpdate::new(
            "Recording Saved",
            "Your recording is ready for transcription!",
        ));

        Ok(artifact)
    }

    /// Tear the session down without producing an artifact
    pub async fn cancel(&self, status: &dyn StatusSink) -> Result<CancelOutcome, RecordingError> {
        let Some(active) = self.take_active() else {
            debug!("Cancel requested with no manual recording");
            return Ok(CancelOutcome::NoRecording);
        };
        let ActiveRecording {
            handle,
            mut encoder,
            ..
        } = *active;

        status.on_status(StatusUpdate::new("Cancelling", "Discarding your recording..."));

        encoder.abort();
        drop(encoder);
        release_off_runtime(handle).await;

        info!("Manual recording cancelled");
        status.on_status(StatusUpdate::new(
            "Cancelled",
            "Recording discarded successfully!",
        ));

        Ok(CancelOutcome::Cancelled)
    }
}
