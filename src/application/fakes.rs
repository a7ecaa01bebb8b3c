//! In-memory port implementations for unit tests

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::application::error::{AcquisitionError, RecordingError};
use crate::application::ports::{
    AudioInput, CaptureHandle, CaptureTrack, ChunkSender, ConfigStore, DetectorEvents,
    DetectorFactory, EncoderFactory, FrameReceiver, SpeechDetector, SpeechEvents, StatusSink,
    StreamEncoder, StreamFormat,
};
use crate::domain::artifact::{AudioMimeType, RecordingArtifact, SpeechSegment};
use crate::domain::config::AppConfig;
use crate::domain::device::Device;
use crate::domain::error::ConfigError;
use crate::domain::recording::Bitrate;
use crate::domain::status::StatusUpdate;

#[derive(Default)]
struct ProbeCounters {
    opens: AtomicUsize,
    releases: AtomicUsize,
    release_threads: Mutex<Vec<ThreadId>>,
}

/// Counts handles opened and tracks stopped
#[derive(Clone, Default)]
pub struct InputProbe {
    counters: Arc<ProbeCounters>,
}

impl InputProbe {
    pub fn handle(&self, device_id: &str) -> CaptureHandle {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel();
        CaptureHandle::new(
            device_id,
            Box::new(FakeTrack {
                probe: self.clone(),
                frames: Some(rx),
                _sender: tx,
                stopped: false,
            }),
        )
    }

    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }

    /// Threads that stopped tracks, in order
    pub fn release_threads(&self) -> Vec<ThreadId> {
        self.counters.release_threads.lock().clone()
    }
}

struct FakeTrack {
    probe: InputProbe,
    frames: Option<FrameReceiver>,
    _sender: mpsc::Sender<Vec<f32>>,
    stopped: bool,
}

impl CaptureTrack for FakeTrack {
    fn format(&self) -> StreamFormat {
        StreamFormat { sample_rate: 16_000 }
    }

    fn take_frames(&mut self) -> Option<FrameReceiver> {
        self.frames.take()
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.probe.counters.releases.fetch_add(1, Ordering::SeqCst);
            self.probe
                .counters
                .release_threads
                .lock()
                .push(thread::current().id());
        }
    }
}

/// Audio input with a fixed device list and a set of devices that open
pub struct FakeInput {
    pub probe: InputProbe,
    devices: Vec<Device>,
    openable: Mutex<HashSet<String>>,
    deny_permission: bool,
    fail_listing: bool,
    enumerations: AtomicUsize,
    attempts: Mutex<Vec<Option<String>>>,
    open_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeInput {
    pub fn new(devices: &[&str], openable: &[&str]) -> Self {
        Self {
            probe: InputProbe::default(),
            devices: devices
                .iter()
                .map(|id| Device::new(*id, format!("Microphone {id}")))
                .collect(),
            openable: Mutex::new(openable.iter().map(|id| id.to_string()).collect()),
            deny_permission: false,
            fail_listing: false,
            enumerations: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
            open_gate: Mutex::new(None),
        }
    }

    /// A device that failed to open starts working, e.g. after replugging
    pub fn make_openable(&self, device_id: &str) {
        self.openable.lock().insert(device_id.to_string());
    }

    /// Make the next `open` wait until the returned notify fires
    pub fn hold_open(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.open_gate.lock() = Some(Arc::clone(&notify));
        notify
    }

    pub fn deny_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    /// Every open attempt in order; `None` is the default-device probe
    pub fn attempts(&self) -> Vec<Option<String>> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl AudioInput for FakeInput {
    async fn request_permission(&self) -> Result<(), AcquisitionError> {
        if self.deny_permission {
            return Err(AcquisitionError::PermissionDenied("denied by test".to_string()));
        }
        Ok(())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, AcquisitionError> {
        if self.fail_listing {
            return Err(AcquisitionError::Platform("listing failed".to_string()));
        }
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.clone())
    }

    async fn open(&self, device_id: Option<&str>) -> Result<CaptureHandle, AcquisitionError> {
        self.attempts.lock().push(device_id.map(str::to_string));

        let gate = self.open_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.deny_permission {
            return Err(AcquisitionError::PermissionDenied("denied by test".to_string()));
        }

        let openable = self.openable.lock().clone();
        match device_id {
            Some(id) if openable.contains(id) => Ok(self.probe.handle(id)),
            Some(id) => Err(AcquisitionError::DeviceUnavailable {
                device_id: id.to_string(),
                reason: "not connected".to_string(),
            }),
            None if !openable.is_empty() => Ok(self.probe.handle("default")),
            None => Err(AcquisitionError::Platform("no default input".to_string())),
        }
    }
}

/// Knobs and counters shared by every encoder a factory creates
#[derive(Default)]
pub struct EncoderControl {
    pub fail_create: AtomicBool,
    pub fail_finalize: AtomicBool,
    pub created: AtomicUsize,
    pub finalized: AtomicUsize,
    pub aborted: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl EncoderControl {
    /// Make `finalize` wait until the returned notify fires
    pub fn hold_finalize(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&notify));
        notify
    }
}

#[derive(Clone, Default)]
pub struct FakeEncoderFactory {
    pub control: Arc<EncoderControl>,
}

impl EncoderFactory for FakeEncoderFactory {
    fn create(
        &self,
        capture: &mut CaptureHandle,
        _bitrate: Bitrate,
    ) -> Result<Box<dyn StreamEncoder>, RecordingError> {
        if self.control.fail_create.load(Ordering::SeqCst) {
            return Err(RecordingError::EncoderInitFailed("unsupported settings".to_string()));
        }
        capture.take_frames()?;
        self.control.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeEncoder {
            control: Arc::clone(&self.control),
            chunks: None,
        }))
    }
}

struct FakeEncoder {
    control: Arc<EncoderControl>,
    chunks: Option<ChunkSender>,
}

#[async_trait]
impl StreamEncoder for FakeEncoder {
    fn mime_type(&self) -> AudioMimeType {
        AudioMimeType::Wav
    }

    fn start(&mut self, _timeslice: StdDuration, chunks: ChunkSender) -> Result<(), RecordingError> {
        let _ = chunks.send(b"head".to_vec());
        let _ = chunks.send(Vec::new());
        self.chunks = Some(chunks);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<(), RecordingError> {
        let gate = self.control.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.control.finalized.fetch_add(1, Ordering::SeqCst);

        let chunks = self.chunks.take();
        if self.control.fail_finalize.load(Ordering::SeqCst) {
            return Err(RecordingError::FinalizeFailed("encoder crashed".to_string()));
        }
        if let Some(chunks) = chunks {
            let _ = chunks.send(b"tail".to_vec());
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.chunks = None;
        self.control.aborted.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct DetectorControl {
    pub fail_create: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_destroy: AtomicBool,
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    destroy_threads: Mutex<Vec<ThreadId>>,
    unfinished: Mutex<Option<SpeechSegment>>,
    events: Mutex<Option<Arc<dyn DetectorEvents>>>,
}

impl DetectorControl {
    /// Speech the detector is in the middle of; returned by `destroy`
    pub fn speaking(&self, segment: SpeechSegment) {
        *self.unfinished.lock() = Some(segment);
    }

    pub fn destroy_threads(&self) -> Vec<ThreadId> {
        self.destroy_threads.lock().clone()
    }
}

/// Detector factory whose boundaries are driven by the test
#[derive(Clone, Default)]
pub struct FakeDetectorFactory {
    pub control: Arc<DetectorControl>,
}

impl FakeDetectorFactory {
    /// Events sink of the most recently created detector
    pub fn emitter(&self) -> Arc<dyn DetectorEvents> {
        match self.control.events.lock().clone() {
            Some(events) => events,
            None => panic!("no detector has been created"),
        }
    }
}

impl DetectorFactory for FakeDetectorFactory {
    fn create(
        &self,
        capture: &mut CaptureHandle,
        events: Arc<dyn DetectorEvents>,
    ) -> Result<Box<dyn SpeechDetector>, RecordingError> {
        if self.control.fail_create.load(Ordering::SeqCst) {
            return Err(RecordingError::DetectorInitFailed("model missing".to_string()));
        }
        capture.take_frames()?;
        self.control.created.fetch_add(1, Ordering::SeqCst);
        *self.control.events.lock() = Some(events);
        Ok(Box::new(FakeDetector {
            control: Arc::clone(&self.control),
        }))
    }
}

struct FakeDetector {
    control: Arc<DetectorControl>,
}

impl SpeechDetector for FakeDetector {
    fn start(&mut self) -> Result<(), RecordingError> {
        if self.control.fail_start.load(Ordering::SeqCst) {
            return Err(RecordingError::DetectorInitFailed("worker failed".to_string()));
        }
        Ok(())
    }

    fn destroy(&mut self) -> Result<Option<SpeechSegment>, RecordingError> {
        self.control.destroyed.fetch_add(1, Ordering::SeqCst);
        self.control.destroy_threads.lock().push(thread::current().id());
        if self.control.fail_destroy.load(Ordering::SeqCst) {
            return Err(RecordingError::DetectorTeardownFailed("worker stuck".to_string()));
        }
        Ok(self.control.unfinished.lock().take())
    }
}

/// Collects speech events
#[derive(Default)]
pub struct RecordingSpeechEvents {
    pub starts: AtomicUsize,
    pub misfires: AtomicUsize,
    artifacts: Mutex<Vec<RecordingArtifact>>,
}

impl RecordingSpeechEvents {
    pub fn artifacts(&self) -> Vec<RecordingArtifact> {
        self.artifacts.lock().clone()
    }
}

impl SpeechEvents for RecordingSpeechEvents {
    fn on_speech_start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_speech_end(&self, artifact: RecordingArtifact) {
        self.artifacts.lock().push(artifact);
    }

    fn on_misfire(&self) {
        self.misfires.fetch_add(1, Ordering::SeqCst);
    }
}

/// Collects status updates
#[derive(Default)]
pub struct RecordingStatus {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl RecordingStatus {
    pub fn titles(&self) -> Vec<String> {
        self.updates.lock().iter().map(|u| u.title.clone()).collect()
    }
}

impl StatusSink for RecordingStatus {
    fn on_status(&self, update: StatusUpdate) {
        self.updates.lock().push(update);
    }
}

/// Config store kept in memory
#[derive(Default)]
pub struct MemoryConfigStore {
    config: Mutex<AppConfig>,
    pub fail_save: AtomicBool,
    pub saves: AtomicUsize,
}

impl MemoryConfigStore {
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config: Mutex::new(config),
            ..Default::default()
        }
    }

    pub fn current(&self) -> AppConfig {
        self.config.lock().clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        Ok(self.config.lock().clone())
    }

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(ConfigError::WriteError("read-only".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.config.lock() = config.clone();
        Ok(())
    }

    fn path(&self) -> PathBuf {
        PathBuf::from("memory://config.toml")
    }

    fn exists(&self) -> bool {
        true
    }

    async fn init(&self) -> Result<(), ConfigError> {
        Err(ConfigError::AlreadyExists(self.path().display().to_string()))
    }
}
