//! Recording infrastructure module
//!
//! cpal microphone capture, a streaming WAV encoder for manual recordings
//! and a WebRTC speech detector for voice activated sessions.

mod cpal_input;
mod pcm;
mod wav_encoder;
mod webrtc_detector;

pub use cpal_input::CpalInput;
pub use pcm::StreamResampler;
pub use wav_encoder::{PcmLayout, WavEncoderFactory, WavStreamEncoder};
pub use webrtc_detector::{GateEvent, SpeechGate, WebRtcDetector, WebRtcDetectorFactory};
