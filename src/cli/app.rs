//! Command runners

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, warn};

use crate::application::ports::{ArtifactStore, ConfigStore, SpeechEvents};
use crate::application::{RecordingService, StartOverrides};
use crate::domain::artifact::RecordingArtifact;
use crate::domain::config::AppConfig;
use crate::domain::recording::{Bitrate, Duration};
use crate::infrastructure::{
    CpalInput, FileArtifactStore, WavEncoderFactory, WebRtcDetectorFactory, XdgConfigStore,
};

use super::args::{ListenArgs, RecordArgs};
use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

const PROGRESS_TICK: StdDuration = StdDuration::from_millis(100);

type PlatformService =
    RecordingService<CpalInput, WavEncoderFactory, WebRtcDetectorFactory, XdgConfigStore>;

/// Load settings over defaults. Environment and flags are layered on by clap.
pub async fn load_merged_config<S: ConfigStore>(store: &S) -> AppConfig {
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config)
}

fn build_service(config: &AppConfig) -> PlatformService {
    RecordingService::new(
        Arc::new(CpalInput::new()),
        WavEncoderFactory,
        WebRtcDetectorFactory::new(config.vad_tuning()),
        Arc::new(XdgConfigStore::new()),
    )
}

fn artifact_store(output: Option<PathBuf>, config: &AppConfig) -> FileArtifactStore {
    FileArtifactStore::new(
        output
            .or_else(|| config.output_dir())
            .unwrap_or_else(FileArtifactStore::default_dir),
    )
}

/// List input devices
pub async fn run_devices(json: bool) -> ExitCode {
    let presenter = Presenter::new();
    let config = load_merged_config(&XdgConfigStore::new()).await;
    let service = build_service(&config);

    let devices = match service.enumerate_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            presenter.recording_error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        match serde_json::to_string_pretty(&devices) {
            Ok(text) => presenter.output(&text),
            Err(e) => {
                presenter.error(&format!("Failed to encode device list: {}", e));
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        presenter.device_list(&devices, config.preferred_device());
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Manual recording until Ctrl+C or the duration limit
pub async fn run_record(args: RecordArgs) -> ExitCode {
    let mut presenter = Presenter::new();
    let config = load_merged_config(&XdgConfigStore::new()).await;

    let bitrate = match args.bitrate.as_deref().map(str::parse::<Bitrate>).transpose() {
        Ok(bitrate) => bitrate,
        Err(e) => {
            presenter.error(&format!("Invalid bitrate: {}", e));
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let limit = match args.duration.as_deref().map(str::parse::<Duration>).transpose() {
        Ok(duration) => duration.unwrap_or_else(|| config.max_duration_or_default()),
        Err(e) => {
            presenter.error(&format!("Invalid duration: {}", e));
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup() {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let service = build_service(&config);
    let store = artifact_store(args.output, &config);
    let overrides = StartOverrides {
        device_id: args.device,
        bitrate,
    };

    let outcome = match service.start_manual(&overrides, &presenter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            presenter.recording_error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    presenter.acquisition_outcome(&outcome);

    presenter.start_spinner("Recording... (Ctrl+C to stop)");
    let total_ms = limit.as_millis();
    let mut ticker = tokio::time::interval(PROGRESS_TICK);
    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                debug!("Stop requested");
                break;
            }
            _ = ticker.tick() => {
                let elapsed_ms = service
                    .manual()
                    .elapsed()
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                presenter.update_recording_progress(elapsed_ms, total_ms);
                if elapsed_ms >= total_ms {
                    debug!(limit = %limit, "Duration limit reached");
                    break;
                }
            }
        }
    }
    presenter.stop_spinner();

    let artifact = match service.stop_manual(&presenter).await {
        Ok(artifact) => artifact,
        Err(e) => {
            presenter.recording_error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match store.save(&artifact, "recording").await {
        Ok(path) => {
            presenter.success(&format!(
                "Recording saved ({})",
                artifact.human_readable_size()
            ));
            presenter.output(&path.display().to_string());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

enum ListenEvent {
    SpeechStart,
    Segment(RecordingArtifact),
    Misfire,
}

/// Forwards detector callbacks to the command loop
struct ChannelSpeechEvents {
    tx: UnboundedSender<ListenEvent>,
}

impl SpeechEvents for ChannelSpeechEvents {
    fn on_speech_start(&self) {
        let _ = self.tx.send(ListenEvent::SpeechStart);
    }

    fn on_speech_end(&self, artifact: RecordingArtifact) {
        let _ = self.tx.send(ListenEvent::Segment(artifact));
    }

    fn on_misfire(&self) {
        let _ = self.tx.send(ListenEvent::Misfire);
    }
}

/// Voice-activated capture, one file per segment
pub async fn run_listen(args: ListenArgs) -> ExitCode {
    let presenter = Presenter::new();
    let config = load_merged_config(&XdgConfigStore::new()).await;

    let limit = match args.max_duration.as_deref().map(str::parse::<Duration>).transpose() {
        Ok(limit) => limit,
        Err(e) => {
            presenter.error(&format!("Invalid max-duration: {}", e));
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup() {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let service = build_service(&config);
    let store = artifact_store(args.output, &config);
    let overrides = StartOverrides {
        device_id: args.device,
        bitrate: None,
    };
    let (tx, mut rx) = unbounded_channel();
    let events = Arc::new(ChannelSpeechEvents { tx });

    let outcome = match service.start_vad(&overrides, events, &presenter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            presenter.recording_error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    presenter.acquisition_outcome(&outcome);
    presenter.info("Listening... (Ctrl+C to stop)");

    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit.as_std()).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut saved = 0usize;
    let mut failed = false;
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = &mut deadline => {
                debug!("Listening limit reached");
                break;
            }
            Some(event) = rx.recv() => {
                failed |= !handle_listen_event(event, &store, &presenter, &mut saved).await;
            }
        }
    }

    if let Err(e) = service.stop_vad().await {
        presenter.recording_error(&e);
        failed = true;
    }

    // Segments finished just before the stop
    while let Ok(event) = rx.try_recv() {
        failed |= !handle_listen_event(event, &store, &presenter, &mut saved).await;
    }

    presenter.success(&format!(
        "Saved {} speech segment{} to {}",
        saved,
        if saved == 1 { "" } else { "s" },
        store.location().display()
    ));

    if failed {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}

/// Returns false when a segment could not be written
async fn handle_listen_event(
    event: ListenEvent,
    store: &FileArtifactStore,
    presenter: &Presenter,
    saved: &mut usize,
) -> bool {
    match event {
        ListenEvent::SpeechStart => {
            debug!("Speech started");
            true
        }
        ListenEvent::Misfire => {
            debug!("Ignored a short burst of sound");
            true
        }
        ListenEvent::Segment(artifact) => match store.save(&artifact, "segment").await {
            Ok(path) => {
                *saved += 1;
                presenter.output(&path.display().to_string());
                true
            }
            Err(e) => {
                presenter.error(&e.to_string());
                false
            }
        },
    }
}
