//! Recording service: settings-aware entry point over both modes

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::acquisition::{CaptureAcquisition, DeviceDirectory};
use crate::application::coordinator::{ModeCoordinator, RegisteredMode, SwitchReport};
use crate::application::error::RecordingError;
use crate::application::manual::ManualRecorder;
use crate::application::ports::{
    AudioInput, ConfigStore, DetectorFactory, EncoderFactory, SpeechEvents, StatusSink,
};
use crate::application::vad::VoiceActivitySegmenter;
use crate::domain::artifact::RecordingArtifact;
use crate::domain::config::AppConfig;
use crate::domain::device::{Device, DeviceAcquisitionOutcome};
use crate::domain::recording::{Bitrate, CancelOutcome, RecordingMode};
use crate::domain::status::StatusUpdate;

/// Per-call values that win over stored settings
#[derive(Debug, Clone, Default)]
pub struct StartOverrides {
    pub device_id: Option<String>,
    pub bitrate: Option<Bitrate>,
}

/// Owns one recorder per mode and the coordinator over them.
///
/// Each start first sweeps the other mode, then reads the preferred device
/// and bitrate from settings, and remembers the device that was opened when
/// nothing had been selected.
pub struct RecordingService<I, E, D, S>
where
    I: AudioInput + 'static,
    E: EncoderFactory + 'static,
    D: DetectorFactory + 'static,
    S: ConfigStore,
{
    manual: Arc<ManualRecorder<I, E>>,
    vad: Arc<VoiceActivitySegmenter<I, D>>,
    coordinator: ModeCoordinator,
    directory: DeviceDirectory<I>,
    settings: Arc<S>,
}

impl<I, E, D, S> RecordingService<I, E, D, S>
where
    I: AudioInput + 'static,
    E: EncoderFactory + 'static,
    D: DetectorFactory + 'static,
    S: ConfigStore,
{
    pub fn new(input: Arc<I>, encoders: E, detectors: D, settings: Arc<S>) -> Self {
        let acquisition = CaptureAcquisition::new(input);
        let directory = acquisition.directory().clone();
        let manual = Arc::new(ManualRecorder::new(acquisition.clone(), encoders));
        let vad = Arc::new(VoiceActivitySegmenter::new(acquisition, detectors));
        let coordinator = ModeCoordinator::new(vec![
            Arc::clone(&manual) as Arc<dyn RegisteredMode>,
            Arc::clone(&vad) as Arc<dyn RegisteredMode>,
        ]);

        Self {
            manual,
            vad,
            coordinator,
            directory,
            settings,
        }
    }

    pub fn manual(&self) -> &ManualRecorder<I, E> {
        &self.manual
    }

    pub fn vad(&self) -> &VoiceActivitySegmenter<I, D> {
        &self.vad
    }

    pub fn active_modes(&self) -> Vec<RecordingMode> {
        self.coordinator.active_modes()
    }

    pub async fn enumerate_devices(&self) -> Result<Vec<Device>, RecordingError> {
        Ok(self.directory.enumerate().await?)
    }

    pub async fn start_manual(
        &self,
        overrides: &StartOverrides,
        status: &dyn StatusSink,
    ) -> Result<DeviceAcquisitionOutcome, RecordingError> {
        let report = self.coordinator.switch_to(RecordingMode::Manual).await;
        Self::report_sweep(&report, status);

        let config = self.load_settings().await;
        let device_id = overrides.device_id.as_deref().or(config.preferred_device());
        let bitrate = overrides
            .bitrate
            .unwrap_or_else(|| config.bitrate_or_default());

        let outcome = self.manual.start(device_id, bitrate, status).await?;
        self.remember_device(&outcome).await;
        Ok(outcome)
    }

    pub async fn stop_manual(&self, status: &dyn StatusSink) -> Result<RecordingArtifact, RecordingError> {
        self.manual.stop(status).await
    }

    pub async fn cancel_manual(&self, status: &dyn StatusSink) -> Result<CancelOutcome, RecordingError> {
        self.manual.cancel(status).await
    }

    pub async fn start_vad(
        &self,
        overrides: &StartOverrides,
        events: Arc<dyn SpeechEvents>,
        status: &dyn StatusSink,
    ) -> Result<DeviceAcquisitionOutcome, RecordingError> {
        let report = self.coordinator.switch_to(RecordingMode::Vad).await;
        Self::report_sweep(&report, status);

        let config = self.load_settings().await;
        let device_id = overrides.device_id.as_deref().or(config.preferred_device());

        let outcome = self.vad.start(device_id, events, status).await?;
        self.remember_device(&outcome).await;
        Ok(outcome)
    }

    pub async fn stop_vad(&self) -> Result<(), RecordingError> {
        self.vad.stop().await
    }

    fn report_sweep(report: &SwitchReport, status: &dyn StatusSink) {
        if report.is_clean() {
            return;
        }
        warn!(failures = report.failures.len(), "Starting with modes that did not stop cleanly");
        for failure in &report.failures {
            status.on_status(StatusUpdate::new(
                "Could Not Stop Previous Recording",
                format!("The {} recording did not stop cleanly: {}", failure.mode, failure.error),
            ));
        }
    }

    async fn load_settings(&self) -> AppConfig {
        match self.settings.load().await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to load settings, using defaults");
                AppConfig::empty()
            }
        }
    }

    /// Persist the fallback device when nothing had been selected.
    /// Failures are logged and never fail the recording.
    async fn remember_device(&self, outcome: &DeviceAcquisitionOutcome) {
        let Some(device_id) = outcome.device_to_remember() else {
            if let Some(fallback) = outcome.fallback_device_id() {
                debug!(device = fallback, "Keeping selected device despite fallback");
            }
            return;
        };

        let mut config = match self.settings.load().await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Could not load settings to remember device");
                return;
            }
        };
        config.device_id = Some(device_id.to_string());

        match self.settings.save(&config).await {
            Ok(()) => info!(device = device_id, "Remembered fallback device as default"),
            Err(e) => warn!(device = device_id, error = %e, "Could not remember fallback device"),
        }
    }
}
