use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::{LiveFailureReason, RemoteFailureReason, Timestamp, TranscriptionMethod};

/// Domain events emitted by the acquisition engine.
///
/// Events are published on an [`EventBus`] and consumed by whatever UI layer
/// is listening (the manual-entry component listens for
/// `ManualInputRequired`, for instance).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum VoiceEvent {
    /// A new acquisition session was created.
    SessionStarted {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// The recorder is armed and buffering audio.
    RecordingStarted {
        session_id: Uuid,
        encoding: String,
        timestamp: Timestamp,
    },

    /// Buffered capture ended.
    RecordingStopped {
        session_id: Uuid,
        payload_bytes: usize,
        manually_stopped: bool,
        timestamp: Timestamp,
    },

    /// Human-readable progress update.
    StatusUpdated {
        session_id: Uuid,
        status: String,
        timestamp: Timestamp,
    },

    /// The remote transcription step failed; the engine moves on.
    PrimaryPathFailed {
        session_id: Uuid,
        reason: RemoteFailureReason,
        message: String,
        timestamp: Timestamp,
    },

    /// The live-recognition step failed; the engine moves on.
    LivePathFailed {
        session_id: Uuid,
        reason: LiveFailureReason,
        message: String,
        timestamp: Timestamp,
    },

    /// The heuristic classifier disagreed with the service and won.
    LanguageOverridden {
        session_id: Uuid,
        service_language: String,
        heuristic_language: String,
        timestamp: Timestamp,
    },

    /// A transcription was delivered to the caller.
    TranscriptionSucceeded {
        session_id: Uuid,
        method: TranscriptionMethod,
        language: String,
        text_length: usize,
        timestamp: Timestamp,
    },

    /// Both automated paths failed; the user should type instead.
    ManualInputRequired {
        session_id: Uuid,
        reason: String,
        timestamp: Timestamp,
    },

    /// The user stopped the session before any usable result.
    SessionCancelled {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// The session ended with an error surfaced to the caller.
    SessionFailed {
        session_id: Uuid,
        reason: String,
        timestamp: Timestamp,
    },
}

impl VoiceEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            VoiceEvent::SessionStarted { timestamp, .. }
            | VoiceEvent::RecordingStarted { timestamp, .. }
            | VoiceEvent::RecordingStopped { timestamp, .. }
            | VoiceEvent::StatusUpdated { timestamp, .. }
            | VoiceEvent::PrimaryPathFailed { timestamp, .. }
            | VoiceEvent::LivePathFailed { timestamp, .. }
            | VoiceEvent::LanguageOverridden { timestamp, .. }
            | VoiceEvent::TranscriptionSucceeded { timestamp, .. }
            | VoiceEvent::ManualInputRequired { timestamp, .. }
            | VoiceEvent::SessionCancelled { timestamp, .. }
            | VoiceEvent::SessionFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the session the event belongs to.
    pub fn session_id(&self) -> Uuid {
        match self {
            VoiceEvent::SessionStarted { session_id, .. }
            | VoiceEvent::RecordingStarted { session_id, .. }
            | VoiceEvent::RecordingStopped { session_id, .. }
            | VoiceEvent::StatusUpdated { session_id, .. }
            | VoiceEvent::PrimaryPathFailed { session_id, .. }
            | VoiceEvent::LivePathFailed { session_id, .. }
            | VoiceEvent::LanguageOverridden { session_id, .. }
            | VoiceEvent::TranscriptionSucceeded { session_id, .. }
            | VoiceEvent::ManualInputRequired { session_id, .. }
            | VoiceEvent::SessionCancelled { session_id, .. }
            | VoiceEvent::SessionFailed { session_id, .. } => *session_id,
        }
    }

    /// Returns the notification name used by listeners.
    pub fn event_name(&self) -> &'static str {
        match self {
            VoiceEvent::SessionStarted { .. } => "session_started",
            VoiceEvent::RecordingStarted { .. } => "recording_started",
            VoiceEvent::RecordingStopped { .. } => "recording_stopped",
            VoiceEvent::StatusUpdated { .. } => "status_updated",
            VoiceEvent::PrimaryPathFailed { .. } => "primary_path_failed",
            VoiceEvent::LivePathFailed { .. } => "live_path_failed",
            VoiceEvent::LanguageOverridden { .. } => "language_overridden",
            VoiceEvent::TranscriptionSucceeded { .. } => "transcription_succeeded",
            VoiceEvent::ManualInputRequired { .. } => "voice_recognition_fallback",
            VoiceEvent::SessionCancelled { .. } => "session_cancelled",
            VoiceEvent::SessionFailed { .. } => "session_failed",
        }
    }
}

/// Broadcast channel for [`VoiceEvent`]s.
///
/// Publishing never blocks and never fails; events are dropped when nobody
/// is subscribed.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VoiceEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: VoiceEvent) {
        tracing::trace!(event = event.event_name(), "Publishing voice event");
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}
