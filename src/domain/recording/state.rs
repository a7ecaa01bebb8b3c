//! Session states for the recording modes

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidModeError;

/// State of a push-button (manual) recording session.
///
/// State machine:
///   IDLE -> RECORDING (start)
///   RECORDING -> IDLE (stop, cancel)
///   IDLE -> IDLE (cancel with nothing active)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
}

impl SessionState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a voice-activated session.
///
/// State machine:
///   IDLE -> LISTENING (start)
///   LISTENING -> SPEECH_DETECTED (speech onset)
///   SPEECH_DETECTED -> LISTENING (speech end, misfire)
///   LISTENING | SPEECH_DETECTED -> IDLE (stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VadState {
    #[default]
    Idle,
    Listening,
    SpeechDetected,
}

impl VadState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::SpeechDetected => "speech-detected",
        }
    }

    /// Whether the session currently holds a capture handle
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for VadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutually exclusive recording strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingMode {
    Manual,
    Vad,
}

impl RecordingMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Vad => "vad",
        }
    }

    pub fn all() -> &'static [RecordingMode] {
        &[Self::Manual, Self::Vad]
    }
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordingMode {
    type Err = InvalidModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "vad" | "voice" | "voice-activated" => Ok(Self::Vad),
            _ => Err(InvalidModeError {
                input: s.to_string(),
            }),
        }
    }
}

/// Result of cancelling a manual session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Nothing was recording
    NoRecording,
    /// The running session was torn down and its data discarded
    Cancelled,
}

impl CancelOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoRecording => "no-recording",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CancelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_states_are_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        assert_eq!(VadState::default(), VadState::Idle);
    }

    #[test]
    fn vad_activity() {
        assert!(!VadState::Idle.is_active());
        assert!(VadState::Listening.is_active());
        assert!(VadState::SpeechDetected.is_active());
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Recording.to_string(), "recording");
        assert_eq!(VadState::SpeechDetected.to_string(), "speech-detected");
        assert_eq!(CancelOutcome::NoRecording.to_string(), "no-recording");
    }

    #[test]
    fn parse_modes() {
        assert_eq!("manual".parse::<RecordingMode>().unwrap(), RecordingMode::Manual);
        assert_eq!("VAD".parse::<RecordingMode>().unwrap(), RecordingMode::Vad);
        assert_eq!("voice".parse::<RecordingMode>().unwrap(), RecordingMode::Vad);
        assert!("native".parse::<RecordingMode>().is_err());
    }
}
