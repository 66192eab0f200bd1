//! One-shot completion handle for the manual-entry fallback.

use std::fmt;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use scanspeak_core::{EventBus, Timestamp, TranscriptionMethod, TranscriptionResult, VoiceEvent};

use crate::callbacks::AcquisitionCallbacks;

/// Handed to the caller when both automated paths have failed.
///
/// Exactly one of [`submit`](ManualInput::submit) or
/// [`cancel`](ManualInput::cancel) resolves it. Dropping the handle
/// unresolved counts as a cancellation.
pub struct ManualInput {
    session_id: Uuid,
    prompt: String,
    callbacks: Arc<dyn AcquisitionCallbacks>,
    events: Option<EventBus>,
    resolved: bool,
}

impl ManualInput {
    pub(crate) fn new(
        session_id: Uuid,
        prompt: String,
        callbacks: Arc<dyn AcquisitionCallbacks>,
        events: Option<EventBus>,
    ) -> Self {
        Self {
            session_id,
            prompt,
            callbacks,
            events,
            resolved: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Message to show next to the text input.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Deliver typed text as a manual transcription.
    ///
    /// The text is trimmed and tagged with the heuristic classifier. Blank
    /// text cancels and returns `None`.
    pub fn submit(mut self, text: &str) -> Option<TranscriptionResult> {
        self.resolved = true;
        let language = scanspeak_language::classify(text);
        let Some(result) = TranscriptionResult::new(text, language, TranscriptionMethod::Manual)
        else {
            self.cancelled();
            return None;
        };

        info!(
            session_id = %self.session_id,
            language = %result.language,
            chars = result.text.chars().count(),
            "Manual input received"
        );
        self.publish(VoiceEvent::TranscriptionSucceeded {
            session_id: self.session_id,
            method: TranscriptionMethod::Manual,
            language: result.language.clone(),
            text_length: result.text.len(),
            timestamp: Timestamp::now(),
        });
        self.callbacks.on_transcription_success(result.clone());
        Some(result)
    }

    /// Dismiss the manual entry without text.
    pub fn cancel(mut self) {
        self.resolved = true;
        self.cancelled();
    }

    fn cancelled(&self) {
        info!(session_id = %self.session_id, "Manual input dismissed");
        self.publish(VoiceEvent::SessionCancelled {
            session_id: self.session_id,
            timestamp: Timestamp::now(),
        });
    }

    fn publish(&self, event: VoiceEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

impl Drop for ManualInput {
    fn drop(&mut self) {
        if !self.resolved {
            self.cancelled();
        }
    }
}

impl fmt::Debug for ManualInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualInput")
            .field("session_id", &self.session_id)
            .field("prompt", &self.prompt)
            .field("resolved", &self.resolved)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{CallbackRecord, MockCallbacks};

    fn handle(callbacks: &Arc<MockCallbacks>, bus: &EventBus) -> ManualInput {
        ManualInput::new(
            Uuid::new_v4(),
            "Type it".to_string(),
            Arc::clone(callbacks) as Arc<dyn AcquisitionCallbacks>,
            Some(bus.clone()),
        )
    }

    #[test]
    fn test_submit_delivers_manual_result() {
        let callbacks = Arc::new(MockCallbacks::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let input = handle(&callbacks, &bus);
        assert_eq!(input.prompt(), "Type it");
        let result = input.submit("  ¿Dónde está la leche?  ").unwrap();

        assert_eq!(result.text, "¿Dónde está la leche?");
        assert_eq!(result.language, "es");
        assert_eq!(result.method, TranscriptionMethod::Manual);
        assert_eq!(callbacks.successes(), vec![result]);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_name(), "transcription_succeeded");
        // Resolved handles publish nothing on drop.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_blank_submit_is_cancellation() {
        let callbacks = Arc::new(MockCallbacks::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        assert!(handle(&callbacks, &bus).submit("   ").is_none());
        assert!(callbacks.records().is_empty());
        assert_eq!(rx.try_recv().unwrap().event_name(), "session_cancelled");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_and_cancel_fire_no_callbacks() {
        let callbacks = Arc::new(MockCallbacks::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        drop(handle(&callbacks, &bus));
        handle(&callbacks, &bus).cancel();

        assert_eq!(callbacks.count(&CallbackRecord::RecordingStop), 0);
        assert!(callbacks.records().is_empty());
        assert_eq!(rx.try_recv().unwrap().event_name(), "session_cancelled");
        assert_eq!(rx.try_recv().unwrap().event_name(), "session_cancelled");
        assert!(rx.try_recv().is_err());
    }
}
