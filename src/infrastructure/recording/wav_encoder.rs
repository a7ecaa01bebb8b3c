//! Streaming PCM WAV encoder
//!
//! Emits a RIFF/WAVE header as the first chunk, then one chunk of PCM
//! payload per timeslice. The sizes in the header are left at their
//! streaming maximum because the length is unknown when it is sent, so the
//! concatenated chunks form a playable file without rewriting the header.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::pcm::{f32_to_i16, f32_to_u8, StreamResampler};
use crate::application::error::RecordingError;
use crate::application::ports::{
    CaptureHandle, ChunkSender, EncoderFactory, FrameReceiver, StreamEncoder,
};
use crate::domain::artifact::AudioMimeType;
use crate::domain::recording::Bitrate;

/// Longest the worker blocks waiting for frames before checking for control
/// messages
const POLL_INTERVAL: StdDuration = StdDuration::from_millis(50);

/// Size written in the header while the final length is unknown
const STREAMING_SIZE: u32 = u32::MAX;

/// Mono PCM layout chosen from a requested bitrate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmLayout {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

/// Candidate layouts, richest first
const LAYOUTS: [PcmLayout; 3] = [
    PcmLayout {
        sample_rate: 16_000,
        bits_per_sample: 16,
    },
    PcmLayout {
        sample_rate: 16_000,
        bits_per_sample: 8,
    },
    PcmLayout {
        sample_rate: 8_000,
        bits_per_sample: 8,
    },
];

impl PcmLayout {
    /// Richest layout whose data rate fits in `bitrate`:
    /// 16 kHz/16-bit (256 kbps), 16 kHz/8-bit (128 kbps), else 8 kHz/8-bit.
    pub fn for_bitrate(bitrate: Bitrate) -> Self {
        let budget = bitrate.kbps() * 1000;
        LAYOUTS
            .iter()
            .copied()
            .find(|layout| layout.data_rate_bps() <= budget)
            .unwrap_or(LAYOUTS[LAYOUTS.len() - 1])
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Payload data rate in bits per second
    pub fn data_rate_bps(&self) -> u32 {
        self.sample_rate * u32::from(self.bits_per_sample)
    }

    /// 44-byte canonical header with streaming sizes
    pub fn header(&self) -> Vec<u8> {
        let block_align = self.bytes_per_sample();
        let byte_rate = self.sample_rate * u32::from(block_align);

        let mut header = Vec::with_capacity(44);
        header.extend_from_slice(b"RIFF");
        header.extend_from_slice(&STREAMING_SIZE.to_le_bytes());
        header.extend_from_slice(b"WAVE");

        header.extend_from_slice(b"fmt ");
        header.extend_from_slice(&16u32.to_le_bytes());
        header.extend_from_slice(&1u16.to_le_bytes()); // PCM
        header.extend_from_slice(&1u16.to_le_bytes()); // mono
        header.extend_from_slice(&self.sample_rate.to_le_bytes());
        header.extend_from_slice(&byte_rate.to_le_bytes());
        header.extend_from_slice(&block_align.to_le_bytes());
        header.extend_from_slice(&self.bits_per_sample.to_le_bytes());

        header.extend_from_slice(b"data");
        header.extend_from_slice(&STREAMING_SIZE.to_le_bytes());
        header
    }

    /// Append `samples` to `out` in this layout's sample format
    pub fn encode(&self, samples: &[f32], out: &mut Vec<u8>) {
        if self.bits_per_sample == 16 {
            out.reserve(samples.len() * 2);
            for &sample in samples {
                out.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
            }
        } else {
            out.extend(samples.iter().map(|&s| f32_to_u8(s)));
        }
    }
}

/// Creates [`WavStreamEncoder`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoderFactory;

impl EncoderFactory for WavEncoderFactory {
    fn create(
        &self,
        capture: &mut CaptureHandle,
        bitrate: Bitrate,
    ) -> Result<Box<dyn StreamEncoder>, RecordingError> {
        let format = capture.format()?;
        let layout = PcmLayout::for_bitrate(bitrate);
        let resampler = StreamResampler::new(format.sample_rate, layout.sample_rate)
            .map_err(RecordingError::EncoderInitFailed)?;
        let frames = capture.take_frames()?;

        debug!(
            device = capture.device_id(),
            input_rate = format.sample_rate,
            output_rate = layout.sample_rate,
            bits = layout.bits_per_sample,
            "Created WAV encoder"
        );

        Ok(Box::new(WavStreamEncoder {
            layout,
            pending: Some((frames, resampler)),
            worker: None,
        }))
    }
}

enum Control {
    Finish,
    Abort,
}

struct Worker {
    control: Sender<Control>,
    done: oneshot::Receiver<Result<(), String>>,
}

/// Encoder whose work runs on a dedicated thread fed by the capture frames
pub struct WavStreamEncoder {
    layout: PcmLayout,
    pending: Option<(FrameReceiver, StreamResampler)>,
    worker: Option<Worker>,
}

#[async_trait]
impl StreamEncoder for WavStreamEncoder {
    fn mime_type(&self) -> AudioMimeType {
        AudioMimeType::Wav
    }

    fn start(&mut self, timeslice: StdDuration, chunks: ChunkSender) -> Result<(), RecordingError> {
        let (frames, resampler) = self
            .pending
            .take()
            .ok_or_else(|| RecordingError::EncoderInitFailed("encoder already started".into()))?;

        chunks
            .send(self.layout.header())
            .map_err(|_| RecordingError::EncoderInitFailed("chunk receiver closed".into()))?;

        let (control_tx, control_rx) = mpsc::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let layout = self.layout;

        thread::Builder::new()
            .name("wav-encoder".into())
            .spawn(move || {
                let result = encode_loop(layout, frames, resampler, control_rx, chunks, timeslice);
                if let Err(e) = &result {
                    warn!(error = %e, "WAV encoder stopped with an error");
                }
                let _ = done_tx.send(result);
            })
            .map_err(|e| RecordingError::EncoderInitFailed(e.to_string()))?;

        self.worker = Some(Worker {
            control: control_tx,
            done: done_rx,
        });
        Ok(())
    }

    async fn finalize(&mut self) -> Result<(), RecordingError> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| RecordingError::FinalizeFailed("encoder was never started".into()))?;

        // The worker may already have exited; its result is still in `done`.
        let _ = worker.control.send(Control::Finish);

        worker
            .done
            .await
            .map_err(|_| RecordingError::FinalizeFailed("encoder thread exited unexpectedly".into()))?
            .map_err(RecordingError::FinalizeFailed)
    }

    fn abort(&mut self) {
        self.pending = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.control.send(Control::Abort);
        }
    }
}

impl Drop for WavStreamEncoder {
    fn drop(&mut self) {
        self.abort();
    }
}

fn encode_loop(
    layout: PcmLayout,
    frames: FrameReceiver,
    mut resampler: StreamResampler,
    control: Receiver<Control>,
    chunks: ChunkSender,
    timeslice: StdDuration,
) -> Result<(), String> {
    let mut payload = Vec::new();
    let mut slice_started = Instant::now();

    loop {
        match control.try_recv() {
            Ok(Control::Finish) => break,
            Ok(Control::Abort) | Err(TryRecvError::Disconnected) => return Ok(()),
            Err(TryRecvError::Empty) => {}
        }

        match frames.recv_timeout(POLL_INTERVAL) {
            Ok(samples) => layout.encode(&resampler.process(&samples)?, &mut payload),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Track stopped; wait for the owner to decide.
                match control.recv() {
                    Ok(Control::Finish) => break,
                    _ => return Ok(()),
                }
            }
        }

        if slice_started.elapsed() >= timeslice {
            slice_started = Instant::now();
            if !payload.is_empty() && chunks.send(std::mem::take(&mut payload)).is_err() {
                return Err("chunk receiver closed".to_string());
            }
        }
    }

    while let Ok(samples) = frames.try_recv() {
        layout.encode(&resampler.process(&samples)?, &mut payload);
    }
    layout.encode(&resampler.flush()?, &mut payload);

    if !payload.is_empty() && chunks.send(payload).is_err() {
        return Err("chunk receiver closed".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CaptureTrack, StreamFormat};
    use tokio::sync::mpsc::unbounded_channel;

    struct ScriptedTrack {
        frames: Option<FrameReceiver>,
    }

    impl CaptureTrack for ScriptedTrack {
        fn format(&self) -> StreamFormat {
            StreamFormat { sample_rate: 16_000 }
        }

        fn take_frames(&mut self) -> Option<FrameReceiver> {
            self.frames.take()
        }

        fn stop(&mut self) {}
    }

    fn scripted_handle() -> (CaptureHandle, Sender<Vec<f32>>) {
        let (tx, rx) = mpsc::channel();
        let handle = CaptureHandle::new("scripted", Box::new(ScriptedTrack { frames: Some(rx) }));
        (handle, tx)
    }

    #[test]
    fn layout_follows_bitrate() {
        let layout = |kbps| PcmLayout::for_bitrate(Bitrate::from_kbps(kbps).unwrap());
        assert_eq!(layout(320), PcmLayout { sample_rate: 16_000, bits_per_sample: 16 });
        assert_eq!(layout(256).data_rate_bps(), 256_000);
        assert_eq!(layout(192), PcmLayout { sample_rate: 16_000, bits_per_sample: 8 });
        assert_eq!(layout(128).data_rate_bps(), 128_000);
        assert_eq!(layout(96), PcmLayout { sample_rate: 8_000, bits_per_sample: 8 });
        assert_eq!(layout(64).data_rate_bps(), 64_000);
    }

    #[test]
    fn header_describes_mono_pcm() {
        let header = PcmLayout::for_bitrate(Bitrate::default()).header();
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..16], b"WAVEfmt ");
        assert_eq!(u16::from_le_bytes([header[22], header[23]]), 1);
        assert_eq!(
            u32::from_le_bytes([header[24], header[25], header[26], header[27]]),
            16_000
        );
        assert_eq!(u16::from_le_bytes([header[34], header[35]]), 16);
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn encode_eight_bit_is_unsigned() {
        let layout = PcmLayout::for_bitrate(Bitrate::from_kbps(64).unwrap());
        let mut out = Vec::new();
        layout.encode(&[0.0, 1.0], &mut out);
        assert_eq!(out, vec![128, 255]);
    }

    #[tokio::test]
    async fn finalize_flushes_all_frames() {
        let (mut handle, frames) = scripted_handle();
        let mut encoder = WavEncoderFactory
            .create(&mut handle, Bitrate::default())
            .unwrap();
        let (tx, mut rx) = unbounded_channel();

        encoder.start(StdDuration::from_millis(1000), tx).unwrap();
        frames.send(vec![0.5; 1600]).unwrap();
        frames.send(vec![-0.5; 1600]).unwrap();
        encoder.finalize().await.unwrap();

        let mut bytes = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            bytes.extend(chunk);
        }
        assert_eq!(bytes.len(), 44 + 3200 * 2);
        assert_eq!(&bytes[..4], b"RIFF");
        handle.release().unwrap();
    }

    #[tokio::test]
    async fn finalize_after_track_stopped_still_completes() {
        let (mut handle, frames) = scripted_handle();
        let mut encoder = WavEncoderFactory
            .create(&mut handle, Bitrate::from_kbps(128).unwrap())
            .unwrap();
        let (tx, mut rx) = unbounded_channel();

        encoder.start(StdDuration::from_millis(1000), tx).unwrap();
        frames.send(vec![0.0; 800]).unwrap();
        drop(frames);
        encoder.finalize().await.unwrap();

        let total: usize = std::iter::from_fn(|| rx.try_recv().ok()).map(|c| c.len()).sum();
        assert_eq!(total, 44 + 800);
        handle.release().unwrap();
    }

    #[tokio::test]
    async fn finalize_without_start_fails() {
        let (mut handle, _frames) = scripted_handle();
        let mut encoder = WavEncoderFactory
            .create(&mut handle, Bitrate::default())
            .unwrap();

        assert!(matches!(
            encoder.finalize().await,
            Err(RecordingError::FinalizeFailed(_))
        ));
        handle.release().unwrap();
    }

    #[test]
    fn second_encoder_on_same_handle_is_rejected() {
        let (mut handle, _frames) = scripted_handle();
        let _first = WavEncoderFactory.create(&mut handle, Bitrate::default()).unwrap();
        assert!(matches!(
            WavEncoderFactory.create(&mut handle, Bitrate::default()),
            Err(RecordingError::Capture(_))
        ));
        handle.release().unwrap();
    }
}
