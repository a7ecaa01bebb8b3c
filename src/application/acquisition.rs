//! Device enumeration and capture acquisition with fallback

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::error::AcquisitionError;
use crate::application::ports::{AudioInput, CaptureHandle, StatusSink};
use crate::domain::device::{Device, DeviceAcquisitionOutcome, FallbackReason};
use crate::domain::status::StatusUpdate;

pub(crate) fn release_quietly(handle: &mut CaptureHandle) {
    if let Err(e) = handle.release() {
        warn!(device = handle.device_id(), error = %e, "Capture handle release failed");
    }
}

/// Release on the blocking pool. Platform tracks join their capture thread
/// when stopped.
pub(crate) async fn release_off_runtime(mut handle: CaptureHandle) {
    let device = handle.device_id().to_string();
    let released = tokio::task::spawn_blocking(move || release_quietly(&mut handle)).await;
    if let Err(e) = released {
        warn!(device = %device, error = %e, "Capture release task failed");
    }
}

/// Lists the input devices the platform exposes.
pub struct DeviceDirectory<I: AudioInput> {
    input: Arc<I>,
}

impl<I: AudioInput> Clone for DeviceDirectory<I> {
    fn clone(&self) -> Self {
        Self {
            input: Arc::clone(&self.input),
        }
    }
}

impl<I: AudioInput> DeviceDirectory<I> {
    pub fn new(input: Arc<I>) -> Self {
        Self { input }
    }

    /// Request permission, open and release a short-lived probe so the
    /// platform fills in device labels, then list input devices.
    ///
    /// A denied probe fails the enumeration; any other probe failure is
    /// logged and the listing still runs.
    pub async fn enumerate(&self) -> Result<Vec<Device>, AcquisitionError> {
        self.input.request_permission().await?;

        match self.input.open(None).await {
            Ok(probe) => release_off_runtime(probe).await,
            Err(e @ AcquisitionError::PermissionDenied(_)) => return Err(e),
            Err(e) => debug!(error = %e, "Probe capture failed, listing devices anyway"),
        }

        let devices = self.input.list_devices().await?;
        debug!(count = devices.len(), "Enumerated input devices");
        Ok(devices)
    }
}

/// An open capture and how it was obtained
#[derive(Debug)]
pub struct AcquiredCapture {
    pub handle: CaptureHandle,
    pub outcome: DeviceAcquisitionOutcome,
}

/// Opens a capture handle, falling back to any working device.
pub struct CaptureAcquisition<I: AudioInput> {
    input: Arc<I>,
    directory: DeviceDirectory<I>,
}

impl<I: AudioInput> Clone for CaptureAcquisition<I> {
    fn clone(&self) -> Self {
        Self {
            input: Arc::clone(&self.input),
            directory: self.directory.clone(),
        }
    }
}

impl<I: AudioInput> CaptureAcquisition<I> {
    pub fn new(input: Arc<I>) -> Self {
        let directory = DeviceDirectory::new(Arc::clone(&input));
        Self { input, directory }
    }

    pub fn directory(&self) -> &DeviceDirectory<I> {
        &self.directory
    }

    /// Open the preferred device, or search the device list in order for
    /// the first one that opens.
    ///
    /// Devices are tried one at a time. When every device fails the search
    /// ends with [`AcquisitionError::NoAvailableDevice`]; it is never retried
    /// here.
    pub async fn acquire(
        &self,
        preferred_device_id: Option<&str>,
        status: &dyn StatusSink,
    ) -> Result<AcquiredCapture, AcquisitionError> {
        let reason = match preferred_device_id {
            None => {
                status.on_status(StatusUpdate::new(
                    "No Device Selected",
                    "No worries! We'll find the best microphone for you automatically...",
                ));
                FallbackReason::NoDeviceSelected
            }
            Some(device_id) => {
                status.on_status(StatusUpdate::new(
                    "Connecting Device",
                    "Almost there! Just need your permission to use the microphone...",
                ));

                match self.input.open(Some(device_id)).await {
                    Ok(handle) => {
                        info!(device = device_id, "Opened preferred device");
                        return Ok(AcquiredCapture {
                            handle,
                            outcome: DeviceAcquisitionOutcome::Success,
                        });
                    }
                    Err(e) => {
                        warn!(device = device_id, error = %e, "Preferred device unavailable");
                        status.on_status(StatusUpdate::new(
                            "Finding a New Microphone",
                            "That microphone isn't working. Let's try finding another one...",
                        ));
                        FallbackReason::PreferredDeviceUnavailable
                    }
                }
            }
        };

        let devices = self
            .directory
            .enumerate()
            .await
            .map_err(|e| AcquisitionError::EnumerationFailed(Box::new(e)))?;

        for device in &devices {
            match self.input.open(Some(&device.id)).await {
                Ok(handle) => {
                    info!(device = %device.id, reason = %reason, "Opened fallback device");
                    return Ok(AcquiredCapture {
                        handle,
                        outcome: DeviceAcquisitionOutcome::Fallback {
                            reason,
                            fallback_device_id: device.id.clone(),
                        },
                    });
                }
                Err(e) => debug!(device = %device.id, error = %e, "Fallback candidate failed"),
            }
        }

        Err(AcquisitionError::NoAvailableDevice {
            selected_device_id: preferred_device_id.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::{FakeInput, RecordingStatus};

    #[tokio::test]
    async fn enumerate_releases_probe() {
        let input = Arc::new(FakeInput::new(&["a", "b"], &["a", "b"]));
        let directory = DeviceDirectory::new(Arc::clone(&input));

        let devices = directory.enumerate().await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(input.probe.opens(), 1);
        assert_eq!(input.probe.releases(), 1);
    }

    #[tokio::test]
    async fn enumerate_fails_when_permission_denied() {
        let input = Arc::new(FakeInput::new(&["a"], &["a"]).deny_permission());
        let directory = DeviceDirectory::new(Arc::clone(&input));

        let err = directory.enumerate().await.unwrap_err();

        assert!(matches!(err, AcquisitionError::PermissionDenied(_)));
        assert_eq!(input.enumerations(), 0);
    }

    #[tokio::test]
    async fn enumerate_continues_when_probe_cannot_open() {
        let input = Arc::new(FakeInput::new(&["a"], &[]));
        let directory = DeviceDirectory::new(Arc::clone(&input));

        let devices = directory.enumerate().await.unwrap();

        assert_eq!(devices, vec![Device::new("a", "Microphone a")]);
        assert_eq!(input.probe.opens(), 0);
    }

    #[tokio::test]
    async fn preferred_device_opens_without_enumeration() {
        let input = Arc::new(FakeInput::new(&["x"], &["y"]));
        let acquisition = CaptureAcquisition::new(Arc::clone(&input));
        let status = RecordingStatus::default();

        let mut acquired = acquisition.acquire(Some("y"), &status).await.unwrap();

        assert_eq!(acquired.outcome, DeviceAcquisitionOutcome::Success);
        assert_eq!(acquired.handle.device_id(), "y");
        assert_eq!(input.enumerations(), 0);
        assert_eq!(status.titles(), vec!["Connecting Device"]);
        acquired.handle.release().unwrap();
    }

    #[tokio::test]
    async fn no_selection_falls_back_to_first_device() {
        let input = Arc::new(FakeInput::new(&["x"], &["x"]));
        let acquisition = CaptureAcquisition::new(Arc::clone(&input));
        let status = RecordingStatus::default();

        let mut acquired = acquisition.acquire(None, &status).await.unwrap();

        assert_eq!(
            acquired.outcome,
            DeviceAcquisitionOutcome::Fallback {
                reason: FallbackReason::NoDeviceSelected,
                fallback_device_id: "x".to_string(),
            }
        );
        assert_eq!(status.titles(), vec!["No Device Selected"]);
        acquired.handle.release().unwrap();
    }

    #[tokio::test]
    async fn unavailable_preference_uses_first_device_that_opens() {
        let input = Arc::new(FakeInput::new(&["a", "b", "c"], &["c"]));
        let acquisition = CaptureAcquisition::new(Arc::clone(&input));
        let status = RecordingStatus::default();

        let mut acquired = acquisition.acquire(Some("gone"), &status).await.unwrap();

        assert_eq!(
            acquired.outcome,
            DeviceAcquisitionOutcome::Fallback {
                reason: FallbackReason::PreferredDeviceUnavailable,
                fallback_device_id: "c".to_string(),
            }
        );
        assert_eq!(
            input.attempts(),
            vec![
                Some("gone".to_string()),
                None,
                Some("a".to_string()),
                Some("b".to_string()),
                Some("c".to_string()),
            ]
        );
        assert_eq!(
            status.titles(),
            vec!["Connecting Device", "Finding a New Microphone"]
        );
        acquired.handle.release().unwrap();
        assert_eq!(input.probe.opens(), input.probe.releases());
    }

    #[tokio::test]
    async fn exhausted_search_reports_no_available_device() {
        let input = Arc::new(FakeInput::new(&["a", "b"], &[]));
        let acquisition = CaptureAcquisition::new(Arc::clone(&input));

        let err = acquisition
            .acquire(Some("a"), &RecordingStatus::default())
            .await
            .unwrap_err();

        match err {
            AcquisitionError::NoAvailableDevice { selected_device_id } => {
                assert_eq!(selected_device_id, Some("a".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(input.probe.opens(), 0);
    }

    #[tokio::test]
    async fn listing_failure_is_wrapped() {
        let input = Arc::new(FakeInput::new(&["a"], &[]).fail_listing());
        let acquisition = CaptureAcquisition::new(Arc::clone(&input));

        let err = acquisition
            .acquire(None, &RecordingStatus::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquisitionError::EnumerationFailed(_)));
    }
}
