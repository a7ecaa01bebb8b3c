//! Single-active-mode enforcement

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::application::error::RecordingError;
use crate::application::manual::ManualRecorder;
use crate::application::ports::{AudioInput, DetectorFactory, EncoderFactory, SilentStatus};
use crate::application::vad::VoiceActivitySegmenter;
use crate::domain::recording::{RecordingMode, SessionState};

/// A recording mode as seen by the coordinator
#[async_trait]
pub trait RegisteredMode: Send + Sync {
    fn mode(&self) -> RecordingMode;

    fn is_active(&self) -> bool;

    /// Stop without user-facing status messages
    async fn stop_silently(&self) -> Result<(), RecordingError>;
}

/// A mode that could not be stopped during a switch
#[derive(Debug, Clone)]
pub struct ModeStopFailure {
    pub mode: RecordingMode,
    pub error: RecordingError,
}

/// What a mode switch did
#[derive(Debug, Clone, Default)]
pub struct SwitchReport {
    pub stopped: Vec<RecordingMode>,
    pub failures: Vec<ModeStopFailure>,
}

impl SwitchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Keeps at most one recording mode active.
///
/// Before a mode starts, every other active mode is stopped in registry
/// order. Stop failures never block the switch; they are logged and
/// collected in the [`SwitchReport`].
pub struct ModeCoordinator {
    registry: Vec<Arc<dyn RegisteredMode>>,
}

impl ModeCoordinator {
    pub fn new(registry: Vec<Arc<dyn RegisteredMode>>) -> Self {
        Self { registry }
    }

    pub fn active_modes(&self) -> Vec<RecordingMode> {
        self.registry
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| entry.mode())
            .collect()
    }

    /// Stop every active mode other than `target`, one at a time
    pub async fn switch_to(&self, target: RecordingMode) -> SwitchReport {
        let mut report = SwitchReport::default();

        for entry in &self.registry {
            let mode = entry.mode();
            if mode == target || !entry.is_active() {
                continue;
            }

            info!(%mode, %target, "Stopping active mode before switching");
            match entry.stop_silently().await {
                Ok(()) => report.stopped.push(mode),
                Err(error) => {
                    warn!(%mode, %target, error = %error, "Failed to stop mode, switching anyway");
                    report.failures.push(ModeStopFailure { mode, error });
                }
            }
        }

        report
    }
}

#[async_trait]
impl<I, E> RegisteredMode for ManualRecorder<I, E>
where
    I: AudioInput + 'static,
    E: EncoderFactory + 'static,
{
    fn mode(&self) -> RecordingMode {
        RecordingMode::Manual
    }

    fn is_active(&self) -> bool {
        self.state() == SessionState::Recording
    }

    /// The finished recording is discarded
    async fn stop_silently(&self) -> Result<(), RecordingError> {
        match self.stop(&SilentStatus).await {
            Ok(artifact) => {
                debug!(size = %artifact.human_readable_size(), "Discarded manual recording stopped by mode switch");
                Ok(())
            }
            Err(RecordingError::NothingToStop) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<I, D> RegisteredMode for VoiceActivitySegmenter<I, D>
where
    I: AudioInput + 'static,
    D: DetectorFactory + 'static,
{
    fn mode(&self) -> RecordingMode {
        RecordingMode::Vad
    }

    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    async fn stop_silently(&self) -> Result<(), RecordingError> {
        self.stop().await
    }
}
