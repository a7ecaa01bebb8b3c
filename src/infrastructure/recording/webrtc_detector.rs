//! WebRTC-based speech detector
//!
//! Capture frames are resampled to 16 kHz, cut into 30 ms frames and
//! classified by `webrtc-vad`. A [`SpeechGate`] turns the per-frame
//! decisions into segment boundaries with onset, hangover and pre-roll.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;

use tracing::{debug, trace, warn};
use webrtc_vad::{SampleRate, Vad, VadMode};

use super::pcm::{f32_to_i16, StreamResampler};
use crate::application::error::RecordingError;
use crate::application::ports::{
    CaptureHandle, DetectorEvents, DetectorFactory, FrameReceiver, SpeechDetector,
};
use crate::domain::artifact::SpeechSegment;
use crate::domain::recording::{VadTuning, VAD_FRAME_MS, VAD_SAMPLE_RATE};

const FRAME_SAMPLES: usize = (VAD_SAMPLE_RATE * VAD_FRAME_MS / 1000) as usize;

const POLL_INTERVAL: StdDuration = StdDuration::from_millis(50);

/// Boundary produced by [`SpeechGate::push`]
#[derive(Debug, Clone, PartialEq)]
pub enum GateEvent {
    SpeechStart,
    /// Finished segment samples, pre-roll included
    SpeechEnd(Vec<f32>),
    Misfire,
}

#[derive(Debug)]
enum GateState {
    Silent {
        pre_roll: VecDeque<Vec<f32>>,
        voiced_run: usize,
    },
    Speaking {
        buffer: Vec<f32>,
        speech_frames: usize,
        silent_run: usize,
    },
}

impl GateState {
    fn silent() -> Self {
        Self::Silent {
            pre_roll: VecDeque::new(),
            voiced_run: 0,
        }
    }
}

/// Frame-decision state machine.
///
/// Speech starts after `onset` consecutive voiced frames and ends after
/// `redemption` consecutive unvoiced ones. Segments with fewer than
/// `min_speech` voiced frames are reported as misfires.
#[derive(Debug)]
pub struct SpeechGate {
    onset: usize,
    redemption: usize,
    min_speech: usize,
    pre_roll_cap: usize,
    state: GateState,
}

impl SpeechGate {
    pub fn new(tuning: &VadTuning) -> Self {
        let onset = tuning.onset_frames();
        Self {
            onset,
            redemption: tuning.redemption_frames(),
            min_speech: tuning.min_speech_frames(),
            pre_roll_cap: tuning.pre_speech_pad_frames() + onset,
            state: GateState::silent(),
        }
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, GateState::Speaking { .. })
    }

    /// Feed one frame and its classification
    pub fn push(&mut self, frame: Vec<f32>, voiced: bool) -> Option<GateEvent> {
        match &mut self.state {
            GateState::Silent {
                pre_roll,
                voiced_run,
            } => {
                pre_roll.push_back(frame);
                while pre_roll.len() > self.pre_roll_cap {
                    pre_roll.pop_front();
                }
                *voiced_run = if voiced { *voiced_run + 1 } else { 0 };

                if *voiced_run < self.onset {
                    return None;
                }

                let speech_frames = *voiced_run;
                let buffer = pre_roll.drain(..).flatten().collect();
                self.state = GateState::Speaking {
                    buffer,
                    speech_frames,
                    silent_run: 0,
                };
                Some(GateEvent::SpeechStart)
            }
            GateState::Speaking {
                buffer,
                speech_frames,
                silent_run,
            } => {
                buffer.extend_from_slice(&frame);
                if voiced {
                    *speech_frames += 1;
                    *silent_run = 0;
                } else {
                    *silent_run += 1;
                }

                if *silent_run < self.redemption {
                    return None;
                }

                let event = if *speech_frames >= self.min_speech {
                    GateEvent::SpeechEnd(std::mem::take(buffer))
                } else {
                    GateEvent::Misfire
                };
                self.state = GateState::silent();
                Some(event)
            }
        }
    }

    /// Close the gate at the end of the stream.
    ///
    /// Speech in progress is returned when it already has `min_speech`
    /// voiced frames; anything else is dropped.
    pub fn finish(&mut self) -> Option<Vec<f32>> {
        match std::mem::replace(&mut self.state, GateState::silent()) {
            GateState::Speaking {
                buffer,
                speech_frames,
                ..
            } if speech_frames >= self.min_speech => Some(buffer),
            _ => None,
        }
    }
}

fn vad_mode(aggressiveness: u8) -> VadMode {
    match aggressiveness {
        0 => VadMode::Quality,
        1 => VadMode::LowBitrate,
        2 => VadMode::Aggressive,
        _ => VadMode::VeryAggressive,
    }
}

/// Creates [`WebRtcDetector`]s with fixed tuning
#[derive(Debug, Clone, Copy, Default)]
pub struct WebRtcDetectorFactory {
    tuning: VadTuning,
}

impl WebRtcDetectorFactory {
    pub fn new(tuning: VadTuning) -> Self {
        Self { tuning }
    }
}

impl DetectorFactory for WebRtcDetectorFactory {
    fn create(
        &self,
        capture: &mut CaptureHandle,
        events: Arc<dyn DetectorEvents>,
    ) -> Result<Box<dyn SpeechDetector>, RecordingError> {
        let format = capture.format()?;
        let resampler = StreamResampler::new(format.sample_rate, VAD_SAMPLE_RATE)
            .map_err(RecordingError::DetectorInitFailed)?;
        let frames = capture.take_frames()?;

        debug!(
            device = capture.device_id(),
            input_rate = format.sample_rate,
            aggressiveness = self.tuning.aggressiveness,
            "Created speech detector"
        );

        Ok(Box::new(WebRtcDetector {
            tuning: self.tuning,
            pending: Some((frames, resampler)),
            events,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }))
    }
}

/// Detector running on its own thread. The `Vad` instance lives on that
/// thread because it cannot be sent between threads.
pub struct WebRtcDetector {
    tuning: VadTuning,
    pending: Option<(FrameReceiver, StreamResampler)>,
    events: Arc<dyn DetectorEvents>,
    running: Arc<AtomicBool>,
    /// Yields the unfinished segment, if any, when the loop exits
    worker: Option<JoinHandle<Option<Vec<f32>>>>,
}

impl SpeechDetector for WebRtcDetector {
    fn start(&mut self) -> Result<(), RecordingError> {
        let (frames, resampler) = self.pending.take().ok_or_else(|| {
            RecordingError::DetectorInitFailed("speech detector already started".into())
        })?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let events = Arc::clone(&self.events);
        let tuning = self.tuning;

        let worker = thread::Builder::new()
            .name("speech-detector".into())
            .spawn(move || detect_loop(tuning, frames, resampler, events, running))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                RecordingError::DetectorInitFailed(e.to_string())
            })?;

        self.worker = Some(worker);
        Ok(())
    }

    fn destroy(&mut self) -> Result<Option<SpeechSegment>, RecordingError> {
        self.running.store(false, Ordering::SeqCst);
        self.pending = None;

        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };

        // Destroyed from one of its own event callbacks; the loop exits on
        // its next iteration.
        if worker.thread().id() == thread::current().id() {
            return Ok(None);
        }

        let tail = worker.join().map_err(|_| {
            RecordingError::DetectorTeardownFailed("speech detector thread panicked".into())
        })?;
        Ok(tail.map(|samples| SpeechSegment::new(samples, VAD_SAMPLE_RATE)))
    }
}

impl Drop for WebRtcDetector {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn detect_loop(
    tuning: VadTuning,
    frames: FrameReceiver,
    mut resampler: StreamResampler,
    events: Arc<dyn DetectorEvents>,
    running: Arc<AtomicBool>,
) -> Option<Vec<f32>> {
    let mut vad = Vad::new_with_rate_and_mode(SampleRate::Rate16kHz, vad_mode(tuning.aggressiveness));
    let mut gate = SpeechGate::new(&tuning);
    let mut pending: Vec<f32> = Vec::new();

    while running.load(Ordering::SeqCst) {
        let samples = match frames.recv_timeout(POLL_INTERVAL) {
            Ok(samples) => samples,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Capture track ended, speech detector stopping");
                break;
            }
        };

        match resampler.process(&samples) {
            Ok(resampled) => pending.extend(resampled),
            Err(e) => {
                warn!(error = %e, "Dropping audio the speech detector could not resample");
                continue;
            }
        }

        while pending.len() >= FRAME_SAMPLES && running.load(Ordering::SeqCst) {
            let frame: Vec<f32> = pending.drain(..FRAME_SAMPLES).collect();
            let pcm: Vec<i16> = frame.iter().map(|&s| f32_to_i16(s)).collect();
            let voiced = vad.is_voice_segment(&pcm).unwrap_or(false);

            match gate.push(frame, voiced) {
                Some(GateEvent::SpeechStart) => {
                    trace!("Speech onset");
                    events.speech_start();
                }
                Some(GateEvent::SpeechEnd(samples)) => {
                    events.speech_end(SpeechSegment::new(samples, VAD_SAMPLE_RATE));
                }
                Some(GateEvent::Misfire) => {
                    trace!("Speech too short, misfire");
                    events.misfire();
                }
                None => {}
            }
        }
    }

    let speaking = gate.is_speaking();
    let tail = gate.finish();
    if speaking && tail.is_none() {
        debug!("Discarding unfinished speech too short to keep");
    }
    tail
}
