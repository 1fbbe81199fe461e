//! Session orchestration.
//!
//! `SessionController` is the single authority over "is capture active".
//! Every toggle runs the full multi-step transition under one session-level
//! mutex, acquired with `try_lock` so a toggle arriving mid-transition is
//! rejected instead of interleaved. The capture backend guards its own
//! subprocess handle behind a second lock; the session lock is always taken
//! first, so no deadlock cycle exists.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::audio::{CaptureBackend, CaptureError};
use crate::clipboard;
use crate::events::{AppEvent, EventBus};
use crate::history::{HistoryStore, HISTORY_LIMIT};
use crate::settings::AppSettings;
use crate::transcription::Transcriber;

/// Bound on the forced-shutdown stop path so shutdown cannot hang.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Internal session state. At most one session is ever Recording.
#[derive(Debug, Clone)]
enum SessionState {
    Idle,
    Recording {
        session_id: Uuid,
        started_at: DateTime<Utc>,
        output_path: PathBuf,
    },
}

/// Outcome of one toggle transition. The `App` facade maps these to the
/// human-readable status strings shown to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// Capture is now running.
    Started,
    /// A toggle was already in flight; this one was rejected.
    Busy,
    /// No API credential is configured; nothing was started.
    ConfigMissing,
    /// The capture tool could not be launched.
    LaunchFailed(String),
    /// Capture stopped but produced no audio.
    NoAudio,
    /// Capture stopped but the recording could not be retrieved.
    StopFailed(String),
    /// Audio was captured but the remote transcription failed.
    TranscriptionFailed(String),
    /// The full pipeline succeeded; carries the recognized text.
    Transcribed(String),
}

pub struct SessionController {
    session: Mutex<SessionState>,
    recording: AtomicBool,
    capture: Arc<dyn CaptureBackend>,
    transcriber: Arc<dyn Transcriber>,
    history: HistoryStore,
    settings: Arc<Mutex<AppSettings>>,
    selected_device: parking_lot::Mutex<Option<String>>,
    events: EventBus,
}

impl SessionController {
    pub fn new(
        capture: Arc<dyn CaptureBackend>,
        transcriber: Arc<dyn Transcriber>,
        history: HistoryStore,
        settings: Arc<Mutex<AppSettings>>,
        events: EventBus,
    ) -> Self {
        Self {
            session: Mutex::new(SessionState::Idle),
            recording: AtomicBool::new(false),
            capture,
            transcriber,
            history,
            settings,
            selected_device: parking_lot::Mutex::new(None),
            events,
        }
    }

    /// Cheap state query; never blocks behind an in-flight transition.
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Choose the input device for subsequent sessions. None reverts to the
    /// platform default.
    pub fn select_device(&self, device_id: Option<String>) {
        log::info!("selected device: {:?}", device_id);
        *self.selected_device.lock() = device_id;
    }

    /// Flip between starting and stopping a session. The entire transition
    /// runs under the session lock; a second toggle during that window gets
    /// `Busy`.
    pub async fn toggle(&self) -> ToggleOutcome {
        let mut state = match self.session.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::warn!("toggle rejected: a transition is already in flight");
                return ToggleOutcome::Busy;
            }
        };

        match state.clone() {
            SessionState::Idle => self.start_session(&mut state).await,
            SessionState::Recording {
                session_id,
                started_at,
                output_path,
            } => {
                self.stop_session(&mut state, session_id, started_at, output_path)
                    .await
            }
        }
    }

    /// Forced shutdown. If a session is recording, run the stop path
    /// synchronously, bounded so shutdown cannot hang on a wedged capture
    /// process or a slow network.
    pub async fn shutdown(&self) {
        if !self.is_recording() {
            return;
        }
        log::info!("shutdown requested while recording, stopping session");

        let stop = async {
            let mut state = self.session.lock().await;
            if let SessionState::Recording {
                session_id,
                started_at,
                output_path,
            } = state.clone()
            {
                self.stop_session(&mut state, session_id, started_at, output_path)
                    .await;
            }
        };

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, stop).await.is_err() {
            log::warn!("shutdown stop timed out after {:?}", SHUTDOWN_TIMEOUT);
        }
    }

    async fn start_session(&self, state: &mut SessionState) -> ToggleOutcome {
        let has_credential = self.settings.lock().await.has_credential();
        if !has_credential {
            log::warn!("toggle refused: no API credential configured");
            return ToggleOutcome::ConfigMissing;
        }

        let device = self.selected_device.lock().clone();
        let session_id = Uuid::new_v4();

        match self.capture.start(device.as_deref()).await {
            Ok(output_path) => {
                *state = SessionState::Recording {
                    session_id,
                    started_at: Utc::now(),
                    output_path,
                };
                self.recording.store(true, Ordering::SeqCst);
                self.events.emit(AppEvent::RecordingStarted);
                log::info!("session {} recording", session_id);
                ToggleOutcome::Started
            }
            Err(e) => {
                log::error!("session {} failed to start capture: {}", session_id, e);
                ToggleOutcome::LaunchFailed(e.to_string())
            }
        }
    }

    async fn stop_session(
        &self,
        state: &mut SessionState,
        session_id: Uuid,
        started_at: DateTime<Utc>,
        output_path: PathBuf,
    ) -> ToggleOutcome {
        let capture_result = self.capture.stop().await;

        // The subprocess handle is released at this point; the session
        // settles to Idle no matter how the rest of the pipeline goes.
        *state = SessionState::Idle;
        self.recording.store(false, Ordering::SeqCst);
        self.events.emit(AppEvent::RecordingStopped);

        let elapsed = Utc::now().signed_duration_since(started_at);
        log::info!(
            "session {} stopped after {} ms",
            session_id,
            elapsed.num_milliseconds()
        );

        let audio = match capture_result {
            Ok(bytes) => bytes,
            Err(CaptureError::NoAudio) => {
                log::warn!("session {}: no audio captured", session_id);
                return ToggleOutcome::NoAudio;
            }
            Err(e) => {
                log::error!("session {}: stopping capture failed: {}", session_id, e);
                return ToggleOutcome::StopFailed(e.to_string());
            }
        };

        let (credential, model, language) = {
            let settings = self.settings.lock().await;
            (
                settings.groq_api_key.clone(),
                settings.model.clone(),
                settings.language.clone(),
            )
        };

        let text = match self
            .transcriber
            .transcribe(audio, &language, &model, &credential)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                log::error!("session {}: transcription failed: {}", session_id, e);
                log::info!("capture file retained for recovery: {:?}", output_path);
                return ToggleOutcome::TranscriptionFailed(e.to_string());
            }
        };

        // Persistence is best-effort; the text is still returned and copied.
        if let Err(e) = self.history.add(&text) {
            log::warn!(
                "session {}: failed to persist transcription: {}",
                session_id,
                e
            );
        }

        clipboard::copy_text(&text);

        match self.history.list(HISTORY_LIMIT) {
            Ok(records) => self.events.emit(AppEvent::HistoryChanged { records }),
            Err(e) => log::warn!("failed to load history for event: {}", e),
        }

        ToggleOutcome::Transcribed(text)
    }
}
