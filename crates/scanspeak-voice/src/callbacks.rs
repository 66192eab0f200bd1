//! The caller-supplied callback set.

use std::sync::Mutex;

use scanspeak_core::{ScanSpeakError, TranscriptionResult};

use crate::manual::ManualInput;

/// Notifications from the engine to its caller (usually a UI layer).
///
/// Callbacks run on the engine's task and must not block. Terminal
/// callbacks fire after the session is released, so a handler may start a
/// new session right away.
pub trait AcquisitionCallbacks: Send + Sync {
    fn on_transcription_success(&self, result: TranscriptionResult);

    fn on_error(&self, error: ScanSpeakError);

    fn on_status_update(&self, _status: &str) {}

    fn on_recording_start(&self) {}

    fn on_recording_stop(&self) {}

    /// Both automated paths failed. Typed text is delivered through `input`;
    /// dropping it cancels.
    fn on_manual_input_required(&self, reason: &str, input: ManualInput);
}

// =============================================================================
// Mock implementation
// =============================================================================

/// One recorded callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackRecord {
    Success(TranscriptionResult),
    /// Display string of the delivered error.
    Error(String),
    Status(String),
    RecordingStart,
    RecordingStop,
    ManualInputRequired(String),
}

/// Records every callback for assertions.
///
/// Manual-input handles are kept until taken with
/// [`MockCallbacks::take_manual_input`], or answered right away when a reply
/// was configured with [`MockCallbacks::replying`].
#[derive(Default)]
pub struct MockCallbacks {
    records: Mutex<Vec<CallbackRecord>>,
    manual_reply: Option<String>,
    pending_input: Mutex<Option<ManualInput>>,
}

impl MockCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every manual-input request with `text`.
    pub fn replying(text: &str) -> Self {
        Self {
            manual_reply: Some(text.to_string()),
            ..Self::default()
        }
    }

    fn record(&self, record: CallbackRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    pub fn records(&self) -> Vec<CallbackRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn successes(&self) -> Vec<TranscriptionResult> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                CallbackRecord::Success(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                CallbackRecord::Error(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                CallbackRecord::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, record: &CallbackRecord) -> usize {
        self.records().iter().filter(|r| *r == record).count()
    }

    pub fn manual_requests(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| matches!(r, CallbackRecord::ManualInputRequired(_)))
            .count()
    }

    /// Take the handle from the last manual-input request.
    pub fn take_manual_input(&self) -> Option<ManualInput> {
        self.pending_input.lock().ok().and_then(|mut p| p.take())
    }
}

impl AcquisitionCallbacks for MockCallbacks {
    fn on_transcription_success(&self, result: TranscriptionResult) {
        self.record(CallbackRecord::Success(result));
    }

    fn on_error(&self, error: ScanSpeakError) {
        self.record(CallbackRecord::Error(error.to_string()));
    }

    fn on_status_update(&self, status: &str) {
        self.record(CallbackRecord::Status(status.to_string()));
    }

    fn on_recording_start(&self) {
        self.record(CallbackRecord::RecordingStart);
    }

    fn on_recording_stop(&self) {
        self.record(CallbackRecord::RecordingStop);
    }

    fn on_manual_input_required(&self, reason: &str, input: ManualInput) {
        self.record(CallbackRecord::ManualInputRequired(reason.to_string()));
        match &self.manual_reply {
            Some(text) => {
                input.submit(text);
            }
            None => {
                if let Ok(mut pending) = self.pending_input.lock() {
                    *pending = Some(input);
                }
            }
        }
    }
}
