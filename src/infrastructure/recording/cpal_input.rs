//! Microphone input using cpal
//!
//! Each open capture runs its stream on a dedicated thread because
//! `cpal::Stream` is not `Send`. The thread downmixes to mono `f32` and
//! forwards blocks over a channel until it is told to stop.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::pcm::{downmix, i16_to_f32};
use crate::application::error::AcquisitionError;
use crate::application::ports::{AudioInput, CaptureHandle, CaptureTrack, FrameReceiver, StreamFormat};
use crate::domain::device::Device;
use crate::domain::recording::VAD_SAMPLE_RATE;

/// Rate asked of the device when it supports it; anything else is resampled
/// downstream.
const PREFERRED_SAMPLE_RATE: u32 = VAD_SAMPLE_RATE;

type Ready = Result<(String, StreamFormat), AcquisitionError>;

/// cpal default-host microphone access
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalInput;

impl CpalInput {
    pub fn new() -> Self {
        Self
    }

    fn list_input_devices() -> Result<Vec<Device>, AcquisitionError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| classify(None, e.to_string()))?;

        Ok(devices
            .filter_map(|device| device.name().ok())
            .map(|name| Device::new(name.clone(), name))
            .collect())
    }

    fn find_device(device_id: Option<&str>) -> Result<(String, cpal::Device), AcquisitionError> {
        let host = cpal::default_host();

        let Some(id) = device_id else {
            let device = host.default_input_device().ok_or_else(|| {
                AcquisitionError::DeviceUnavailable {
                    device_id: "default".into(),
                    reason: "no default input device".into(),
                }
            })?;
            let name = device.name().unwrap_or_else(|_| "default".to_string());
            return Ok((name, device));
        };

        host.input_devices()
            .map_err(|e| classify(Some(id), e.to_string()))?
            .find(|device| device.name().map(|name| name == id).unwrap_or(false))
            .map(|device| (id.to_string(), device))
            .ok_or_else(|| AcquisitionError::DeviceUnavailable {
                device_id: id.to_string(),
                reason: "device not found".into(),
            })
    }

    /// Pick an i16 or f32 config, preferring fewer channels and 16 kHz
    fn get_input_config(
        device_id: &str,
        device: &cpal::Device,
    ) -> Result<(StreamConfig, SampleFormat), AcquisitionError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| classify(Some(device_id), e.to_string()))?;

        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;

        for config in supported_configs {
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }

            let includes_preferred = config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE;

            let is_better = match &best_config {
                None => true,
                Some(current) => {
                    let fewer_channels = config.channels() < current.channels();
                    let better_rate =
                        includes_preferred && current.min_sample_rate().0 > PREFERRED_SAMPLE_RATE;
                    fewer_channels || better_rate
                }
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range = best_config.ok_or_else(|| AcquisitionError::DeviceUnavailable {
            device_id: device_id.to_string(),
            reason: "no supported input format".into(),
        })?;

        let sample_rate = if config_range.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
            && config_range.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
        {
            SampleRate(PREFERRED_SAMPLE_RATE)
        } else {
            config_range.min_sample_rate()
        };

        let config = StreamConfig {
            channels: config_range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok((config, config_range.sample_format()))
    }

    fn build_stream(
        device_id: &str,
        device: &cpal::Device,
        frames: Sender<Vec<f32>>,
    ) -> Result<(cpal::Stream, StreamFormat), AcquisitionError> {
        let (config, sample_format) = Self::get_input_config(device_id, device)?;
        let channels = config.channels;
        let format = StreamFormat {
            sample_rate: config.sample_rate.0,
        };

        let on_error = |err: cpal::StreamError| warn!(error = %err, "Audio stream error");

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let _ = frames.send(downmix(data, channels, i16_to_f32));
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = frames.send(downmix(data, channels, |s| s));
                },
                on_error,
                None,
            ),
            other => {
                return Err(AcquisitionError::DeviceUnavailable {
                    device_id: device_id.to_string(),
                    reason: format!("unsupported sample format {:?}", other),
                })
            }
        }
        .map_err(|e| classify(Some(device_id), e.to_string()))?;

        stream
            .play()
            .map_err(|e| classify(Some(device_id), e.to_string()))?;

        Ok((stream, format))
    }

    /// Body of the capture thread: open, report readiness, hold the stream
    /// until stopped.
    fn run_capture(
        device_id: Option<String>,
        frames: Sender<Vec<f32>>,
        ready: oneshot::Sender<Ready>,
        stop: Receiver<()>,
    ) {
        let opened = Self::find_device(device_id.as_deref()).and_then(|(id, device)| {
            Self::build_stream(&id, &device, frames).map(|(stream, format)| (id, stream, format))
        });

        let (id, stream) = match opened {
            Ok((id, stream, format)) => {
                if ready.send(Ok((id.clone(), format))).is_err() {
                    return;
                }
                (id, stream)
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        debug!(device = %id, "Capture stream running");
        // Returns on an explicit stop or when the track is dropped.
        let _ = stop.recv();
        drop(stream);
        debug!(device = %id, "Capture stream stopped");
    }
}

/// Map a platform error message onto the acquisition taxonomy
fn classify(device_id: Option<&str>, message: String) -> AcquisitionError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("not allowed") || lowered.contains("denied") {
        return AcquisitionError::PermissionDenied(message);
    }

    match device_id {
        Some(id) => AcquisitionError::DeviceUnavailable {
            device_id: id.to_string(),
            reason: message,
        },
        None => AcquisitionError::Platform(message),
    }
}

#[async_trait]
impl AudioInput for CpalInput {
    /// cpal has no explicit permission request; a denied host shows up when
    /// devices are listed or a stream is built.
    async fn request_permission(&self) -> Result<(), AcquisitionError> {
        self.list_devices().await.map(|_| ())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, AcquisitionError> {
        tokio::task::spawn_blocking(Self::list_input_devices)
            .await
            .map_err(|e| AcquisitionError::Platform(format!("Task join error: {}", e)))?
    }

    async fn open(&self, device_id: Option<&str>) -> Result<CaptureHandle, AcquisitionError> {
        let requested = device_id.map(str::to_string);
        let (frame_tx, frame_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread = thread::Builder::new()
            .name("cpal-capture".into())
            .spawn(move || Self::run_capture(requested, frame_tx, ready_tx, stop_rx))
            .map_err(|e| AcquisitionError::Platform(e.to_string()))?;

        let (id, format) = ready_rx
            .await
            .map_err(|_| AcquisitionError::Platform("capture thread exited before opening".into()))??;

        debug!(device = %id, sample_rate = format.sample_rate, "Opened capture");

        Ok(CaptureHandle::new(
            id,
            Box::new(CpalTrack {
                format,
                frames: Some(frame_rx),
                stop: Some(stop_tx),
                thread: Some(thread),
            }),
        ))
    }
}

/// Running capture thread seen from its owner
struct CpalTrack {
    format: StreamFormat,
    frames: Option<FrameReceiver>,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureTrack for CpalTrack {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn take_frames(&mut self) -> Option<FrameReceiver> {
        self.frames.take()
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Capture thread panicked while stopping");
            }
        }
    }
}

impl Drop for CpalTrack {
    fn drop(&mut self) {
        self.stop();
    }
}
