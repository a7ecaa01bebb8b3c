//! CLI presenter for output formatting

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::error::{AcquisitionError, CaptureError, RecordingError};
use crate::application::ports::StatusSink;
use crate::domain::device::{Device, DeviceAcquisitionOutcome, FallbackReason};
use crate::domain::status::StatusUpdate;

/// User-facing rendering of a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub title: &'static str,
    pub description: String,
    pub action: &'static str,
}

impl ErrorView {
    pub fn from_recording_error(error: &RecordingError) -> Self {
        let description = error.to_string();
        let (title, action) = match error {
            RecordingError::Acquisition(e) => return Self::from_acquisition_error(e),
            RecordingError::AlreadyRecording => (
                "Already Recording",
                "Stop the current recording before starting a new one",
            ),
            RecordingError::AlreadyActive => (
                "Already Listening",
                "Stop listening before starting again",
            ),
            RecordingError::NothingToStop => ("Not Recording", "Start a recording first"),
            RecordingError::EncoderInitFailed(_) => (
                "Could Not Start Recording",
                "Try a different bitrate or microphone",
            ),
            RecordingError::FinalizeFailed(_) => (
                "Recording Failed",
                "Record again; the audio could not be saved",
            ),
            RecordingError::DetectorInitFailed(_) => (
                "Could Not Start Listening",
                "Check the [vad] settings and try again",
            ),
            RecordingError::DetectorTeardownFailed(_) => (
                "Could Not Stop Listening",
                "Restart the application to release the microphone",
            ),
            RecordingError::Capture(CaptureError::Released(_))
            | RecordingError::Capture(CaptureError::AlreadySubscribed(_)) => (
                "Microphone Unavailable",
                "Try again",
            ),
        };
        Self {
            title,
            description,
            action,
        }
    }

    pub fn from_acquisition_error(error: &AcquisitionError) -> Self {
        let (title, action) = if error.is_permission_denied() {
            (
                "Microphone Access Denied",
                "Allow microphone access in your system settings and try again",
            )
        } else {
            match error {
                AcquisitionError::NoAvailableDevice { .. } => (
                    "No Microphone Found",
                    "Reconnect your microphone and try again",
                ),
                AcquisitionError::DeviceUnavailable { .. } => (
                    "Microphone Unavailable",
                    "Pick another device with `scribe-capture devices`",
                ),
                _ => (
                    "Audio System Error",
                    "Check that an audio server is running and try again",
                ),
            }
        };
        Self {
            title,
            description: error.to_string(),
            action,
        }
    }
}

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
    is_spinner_active: Arc<AtomicBool>,
}

impl Presenter {
    pub fn new() -> Self {
        Self {
            spinner: None,
            is_spinner_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
        self.is_spinner_active.store(true, Ordering::SeqCst);
    }

    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    /// Print info message to stderr, above the spinner if one is running
    pub fn info(&self, message: &str) {
        self.line(format!("{} {}", "ℹ".cyan(), message));
    }

    pub fn success(&self, message: &str) {
        self.line(format!("{} {}", "✓".green(), message));
    }

    pub fn warn(&self, message: &str) {
        self.line(format!("{} {}", "⚠".yellow(), message));
    }

    pub fn error(&self, message: &str) {
        self.line(format!("{} {}", "✗".red(), message));
    }

    /// Print an error with its suggested action
    pub fn error_view(&self, view: &ErrorView) {
        self.error(&format!("{}: {}", view.title.bold(), view.description));
        self.line(format!("  {} {}", "→".dimmed(), view.action));
    }

    pub fn recording_error(&self, error: &RecordingError) {
        self.error_view(&ErrorView::from_recording_error(error));
    }

    /// Explain a fallback, if one happened
    pub fn acquisition_outcome(&self, outcome: &DeviceAcquisitionOutcome) {
        if let DeviceAcquisitionOutcome::Fallback {
            reason,
            fallback_device_id,
        } = outcome
        {
            match reason {
                FallbackReason::NoDeviceSelected => self.info(&format!(
                    "Using '{}' and saving it as your microphone",
                    fallback_device_id
                )),
                FallbackReason::PreferredDeviceUnavailable => self.warn(&format!(
                    "Selected microphone unavailable, using '{}' for now",
                    fallback_device_id
                )),
            }
        }
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    pub fn device_list(&self, devices: &[Device], selected: Option<&str>) {
        if devices.is_empty() {
            self.warn("No input devices found");
            return;
        }
        for device in devices {
            let marker = if Some(device.id.as_str()) == selected {
                "*".green().to_string()
            } else {
                " ".to_string()
            };
            if device.label == device.id {
                println!("{} {}", marker, device.id.cyan());
            } else {
                println!("{} {} ({})", marker, device.id.cyan(), device.label);
            }
        }
    }

    /// Format elapsed recording time against the limit
    pub fn format_progress(&self, elapsed_ms: u64, total_ms: u64) -> String {
        let elapsed_secs = elapsed_ms / 1000;
        let total_secs = total_ms / 1000;
        let percent = if total_ms > 0 {
            (elapsed_ms as f64 / total_ms as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        let bar_width = 20;
        let filled = ((percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled;

        format!(
            "[{}{}] {:>3}s / {}s",
            "█".repeat(filled).cyan(),
            "░".repeat(empty),
            elapsed_secs,
            total_secs
        )
    }

    pub fn update_recording_progress(&self, elapsed_ms: u64, total_ms: u64) {
        let progress = self.format_progress(elapsed_ms, total_ms);
        self.update_spinner(&format!("Recording... {}", progress));
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    fn line(&self, message: String) {
        match &self.spinner {
            Some(spinner) if self.is_spinner_active.load(Ordering::SeqCst) => {
                spinner.println(message)
            }
            _ => eprintln!("{}", message),
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Status updates go to the spinner while one is running
impl StatusSink for Presenter {
    fn on_status(&self, update: StatusUpdate) {
        if self.is_spinner_active.load(Ordering::SeqCst) {
            self.update_spinner(&format!("{}...", update.title));
        } else {
            self.info(&format!("{}: {}", update.title.bold(), update.description));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_progress_at_start() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(0, 10000);
        assert!(progress.contains("0s / 10s"));
    }

    #[test]
    fn format_progress_at_end() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(12000, 10000);
        assert!(progress.contains("12s / 10s"));
    }

    #[test]
    fn no_device_error_suggests_reconnecting() {
        let error = RecordingError::Acquisition(AcquisitionError::NoAvailableDevice {
            selected_device_id: None,
        });
        let view = ErrorView::from_recording_error(&error);
        assert_eq!(view.title, "No Microphone Found");
        assert_eq!(view.action, "Reconnect your microphone and try again");
        assert!(view.description.contains("couldn't find"));
    }

    #[test]
    fn permission_denied_wins_over_enumeration_wrapper() {
        let error = AcquisitionError::EnumerationFailed(Box::new(
            AcquisitionError::PermissionDenied("blocked".to_string()),
        ));
        assert_eq!(
            ErrorView::from_acquisition_error(&error).title,
            "Microphone Access Denied"
        );
    }

    #[test]
    fn session_errors_have_actions() {
        let view = ErrorView::from_recording_error(&RecordingError::AlreadyRecording);
        assert_eq!(view.title, "Already Recording");
        assert!(!view.action.is_empty());
    }
}
