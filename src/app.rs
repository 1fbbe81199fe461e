//! Operation surface for the presentation layer.
//!
//! Every operation returns a short human-readable status string (or plain
//! data); failures surface as statuses, never as panics. Lifecycle events
//! flow through the broadcast bus obtained from [`App::subscribe_events`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use crate::audio::{
    clear_recordings_dir, list_input_devices, AudioDevice, CaptureBackend, CaptureProcess,
    DEFAULT_CAPTURE_PROGRAM,
};
use crate::events::{AppEvent, EventBus};
use crate::history::{HistoryError, HistoryStore, TranscriptionRecord, HISTORY_LIMIT};
use crate::session::{SessionController, ToggleOutcome};
use crate::settings::{self, AppSettings};
use crate::transcription::{GroqClient, Transcriber};

const DB_FILE_NAME: &str = "murmur.db";

pub struct App {
    controller: Arc<SessionController>,
    history: HistoryStore,
    settings: Arc<Mutex<AppSettings>>,
    settings_path: PathBuf,
    events: EventBus,
    recordings_dir: PathBuf,
}

impl App {
    /// Build the app against the default per-user paths.
    pub fn new() -> Result<Self, String> {
        let settings_path = settings::settings_path()?;
        let db_path = settings_path
            .parent()
            .map(|dir| dir.join(DB_FILE_NAME))
            .ok_or("Could not determine database path")?;
        Self::with_paths(settings_path, &db_path, crate::audio::recordings_dir())
    }

    /// Build the app against explicit paths. Tests use this with temp
    /// directories.
    pub fn with_paths(
        settings_path: PathBuf,
        db_path: &Path,
        recordings_dir: PathBuf,
    ) -> Result<Self, String> {
        let settings = Arc::new(Mutex::new(settings::load_settings(&settings_path)));
        let history = HistoryStore::open(db_path).map_err(|e| e.to_string())?;
        let events = EventBus::default();

        let capture: Arc<dyn CaptureBackend> =
            Arc::new(CaptureProcess::new(recordings_dir.clone()));
        let transcriber: Arc<dyn Transcriber> = Arc::new(GroqClient::new());
        let controller = Arc::new(SessionController::new(
            capture,
            transcriber,
            history.clone(),
            Arc::clone(&settings),
            events.clone(),
        ));

        Ok(Self {
            controller,
            history,
            settings,
            settings_path,
            events,
            recordings_dir,
        })
    }

    /// Flip between starting and stopping a recording session. On a
    /// successful stop the returned status is the transcribed text itself.
    pub async fn toggle_recording(&self) -> String {
        toggle_status(self.controller.toggle().await)
    }

    pub fn is_recording(&self) -> bool {
        self.controller.is_recording()
    }

    /// Up to `limit` most recent transcriptions, newest first.
    pub fn list_recent_transcriptions(
        &self,
        limit: usize,
    ) -> Result<Vec<TranscriptionRecord>, HistoryError> {
        self.history.list(limit)
    }

    /// Full reset: wipe all capture files and all stored transcriptions.
    pub fn clear_history(&self) -> String {
        if let Err(e) = clear_recordings_dir(&self.recordings_dir) {
            log::error!("failed to remove recordings directory: {}", e);
            return format!("Failed to remove recordings directory: {}", e);
        }

        if let Err(e) = self.history.clear() {
            log::error!("failed to clear transcriptions: {}", e);
            return format!("Failed to clear transcriptions: {}", e);
        }

        self.emit_history_changed();
        "Recordings directory cleared".to_string()
    }

    pub async fn get_credential(&self) -> String {
        self.settings.lock().await.groq_api_key.clone()
    }

    pub async fn set_credential(&self, value: String) -> String {
        let snapshot = {
            let mut settings = self.settings.lock().await;
            settings.groq_api_key = value;
            settings.clone()
        };
        match settings::save_settings(&self.settings_path, &snapshot) {
            Ok(()) => "API key saved".to_string(),
            Err(e) => {
                log::error!("failed to save config: {}", e);
                "Failed to save config".to_string()
            }
        }
    }

    pub async fn get_model_preference(&self) -> String {
        self.settings.lock().await.model.clone()
    }

    pub async fn set_model_preference(&self, value: String) -> String {
        let snapshot = {
            let mut settings = self.settings.lock().await;
            settings.model = value;
            settings.clone()
        };
        match settings::save_settings(&self.settings_path, &snapshot) {
            Ok(()) => "Model saved".to_string(),
            Err(e) => {
                log::error!("failed to save config: {}", e);
                "Failed to save config".to_string()
            }
        }
    }

    pub async fn list_audio_devices(&self) -> Vec<AudioDevice> {
        list_input_devices(DEFAULT_CAPTURE_PROGRAM).await
    }

    /// Select the capture device for subsequent sessions; an empty id
    /// reverts to the platform default.
    pub fn select_audio_device(&self, device_id: String) {
        let device = if device_id.is_empty() {
            None
        } else {
            Some(device_id)
        };
        self.controller.select_device(device);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Forced shutdown; stops an in-flight recording best-effort.
    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }

    fn emit_history_changed(&self) {
        match self.history.list(HISTORY_LIMIT) {
            Ok(records) => self.events.emit(AppEvent::HistoryChanged { records }),
            Err(e) => log::warn!("failed to load history for event: {}", e),
        }
    }
}

fn toggle_status(outcome: ToggleOutcome) -> String {
    match outcome {
        ToggleOutcome::Started => "Recording started".to_string(),
        ToggleOutcome::Busy => "A toggle is already in progress".to_string(),
        ToggleOutcome::ConfigMissing => "Please set your Groq API key".to_string(),
        ToggleOutcome::LaunchFailed(e) => format!("Failed to start recording: {}", e),
        ToggleOutcome::NoAudio => "Recording stopped, no audio found".to_string(),
        ToggleOutcome::StopFailed(_) => "Recording stopped, failed to process".to_string(),
        ToggleOutcome::TranscriptionFailed(_) => {
            "Recording stopped, transcription failed".to_string()
        }
        ToggleOutcome::Transcribed(text) => text,
    }
}
