//! Lifecycle events published to the presentation layer.
//!
//! Events are fire-and-forget: they are broadcast to whoever is subscribed
//! at the moment of emission and never acknowledged.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::history::TranscriptionRecord;

/// Events emitted by the session pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AppEvent {
    RecordingStarted,
    RecordingStopped,
    HistoryChanged { records: Vec<TranscriptionRecord> },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::RecordingStarted => "recording-started",
            AppEvent::RecordingStopped => "recording-stopped",
            AppEvent::HistoryChanged { .. } => "history-changed",
        }
    }
}

/// Broadcast fan-out for [`AppEvent`]s.
///
/// Cloning is cheap; all clones feed the same set of subscribers. Emission
/// with no subscribers is not an error.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: AppEvent) {
        log::debug!("emitting event: {}", event.name());
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(AppEvent::RecordingStarted);

        let event = rx.recv().await.expect("event should arrive");
        assert!(matches!(event, AppEvent::RecordingStarted));
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.emit(AppEvent::RecordingStopped);
    }

    #[test]
    fn events_serialize_with_kebab_case_tags() {
        let json = serde_json::to_string(&AppEvent::RecordingStarted).unwrap();
        assert!(json.contains("recording-started"));

        let json = serde_json::to_string(&AppEvent::HistoryChanged { records: vec![] }).unwrap();
        assert!(json.contains("history-changed"));
        assert!(json.contains("records"));
    }
}
