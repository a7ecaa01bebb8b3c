//! Recording value objects

pub mod bitrate;
pub mod duration;
pub mod state;
pub mod tuning;

pub use bitrate::{Bitrate, BITRATE_VALUES_KBPS, DEFAULT_BITRATE_KBPS};
pub use duration::Duration;
pub use state::{CancelOutcome, RecordingMode, SessionState, VadState};
pub use tuning::{VadTuning, VAD_FRAME_MS, VAD_SAMPLE_RATE};
