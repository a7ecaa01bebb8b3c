//! Input devices and the outcome of acquiring one

use std::fmt;

use serde::Serialize;

/// An audio input device as reported by the platform.
/// Identity is the `id`; the label is for display only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Device {
    pub id: String,
    pub label: String,
}

impl Device {
    /// Create a device entry
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Why the preferred device was not the one that got opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// No device was configured, any working input was acceptable
    NoDeviceSelected,
    /// A device was configured but could not be opened
    PreferredDeviceUnavailable,
}

impl FallbackReason {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoDeviceSelected => "no-device-selected",
            Self::PreferredDeviceUnavailable => "preferred-device-unavailable",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a single acquisition attempt.
///
/// Callers use it to decide whether to remember the device that was
/// actually opened as the new default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAcquisitionOutcome {
    /// The preferred device opened
    Success,
    /// Some other device from the enumeration opened
    Fallback {
        reason: FallbackReason,
        fallback_device_id: String,
    },
}

impl DeviceAcquisitionOutcome {
    /// Device that was used instead of the preferred one, if any
    pub fn fallback_device_id(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Fallback {
                fallback_device_id, ..
            } => Some(fallback_device_id),
        }
    }

    /// Device id that should become the stored default.
    ///
    /// Only a fallback taken because nothing was selected is adopted; an
    /// explicit selection that failed stays selected.
    pub fn device_to_remember(&self) -> Option<&str> {
        match self {
            Self::Fallback {
                reason: FallbackReason::NoDeviceSelected,
                fallback_device_id,
            } => Some(fallback_device_id),
            _ => None,
        }
    }

    /// Check if the preferred device was used
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
