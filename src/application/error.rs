//! Error taxonomy of the recording core

use thiserror::Error;

fn no_available_device_message(selected_device_id: &Option<String>) -> &'static str {
    match selected_device_id {
        Some(_) => "We couldn't connect to any microphones. Make sure they're plugged in and try again!",
        None => "Hmm... We couldn't find any microphones to use. Check your connections and try again!",
    }
}

/// Failures while obtaining a capture handle
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    #[error("Microphone access was denied: {0}")]
    PermissionDenied(String),

    #[error("Unable to connect to microphone '{device_id}': {reason}")]
    DeviceUnavailable { device_id: String, reason: String },

    #[error("Audio platform error: {0}")]
    Platform(String),

    #[error("Failed to list recording devices: {0}")]
    EnumerationFailed(Box<AcquisitionError>),

    /// Every enumerated device failed to open. Not retried automatically.
    #[error("{}", no_available_device_message(.selected_device_id))]
    NoAvailableDevice { selected_device_id: Option<String> },
}

impl AcquisitionError {
    /// Whether the platform refused access, directly or during enumeration
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::PermissionDenied(_) => true,
            Self::EnumerationFailed(inner) => inner.is_permission_denied(),
            _ => false,
        }
    }
}

/// Misuse of a capture handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Capture handle for '{0}' has already been released")]
    Released(String),

    #[error("Audio frames from '{0}' are already being consumed")]
    AlreadySubscribed(String),
}

/// Errors from the recording sessions
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("A recording is already in progress. Stop the current recording before starting a new one.")]
    AlreadyRecording,

    #[error("Voice activated listening is already running")]
    AlreadyActive,

    #[error("There is no active recording to stop")]
    NothingToStop,

    #[error("Failed to initialize the audio encoder: {0}")]
    EncoderInitFailed(String),

    #[error("Failed to finish the recording, audio may be lost: {0}")]
    FinalizeFailed(String),

    #[error("Failed to initialize the speech detector: {0}")]
    DetectorInitFailed(String),

    #[error("Failed to shut down the speech detector: {0}")]
    DetectorTeardownFailed(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_available_device_message_depends_on_selection() {
        let selected = AcquisitionError::NoAvailableDevice {
            selected_device_id: Some("usb".to_string()),
        };
        let unselected = AcquisitionError::NoAvailableDevice {
            selected_device_id: None,
        };
        assert!(selected.to_string().contains("couldn't connect"));
        assert!(unselected.to_string().contains("couldn't find"));
    }

    #[test]
    fn permission_denied_seen_through_enumeration() {
        let err = AcquisitionError::EnumerationFailed(Box::new(
            AcquisitionError::PermissionDenied("blocked".to_string()),
        ));
        assert!(err.is_permission_denied());
        assert!(!AcquisitionError::Platform("x".to_string()).is_permission_denied());
    }

    #[test]
    fn acquisition_error_is_transparent_in_recording_error() {
        let err: RecordingError = AcquisitionError::Platform("no host".to_string()).into();
        assert_eq!(err.to_string(), "Audio platform error: no host");
    }
}
