//! The live speech-recognition seam used by the secondary path.
//!
//! A host recognizer is started once per attempt and reports through an
//! event channel. The engine owns the returned [`LiveControl`] for the
//! lifetime of the attempt and aborts it on release.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use scanspeak_core::config::LiveRecognitionConfig;
use scanspeak_core::{LiveFailureReason, ScanSpeakError};

// =============================================================================
// Types
// =============================================================================

/// Options for one live-recognition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRecognitionOptions {
    /// BCP-47 locale, e.g. `en-US`.
    pub locale: String,
    /// Keep listening after the first utterance.
    pub continuous: bool,
    /// Report partial hypotheses.
    pub interim_results: bool,
    pub max_alternatives: u32,
}

impl From<&LiveRecognitionConfig> for LiveRecognitionOptions {
    /// Single utterance, final results only, one alternative.
    fn from(config: &LiveRecognitionConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            continuous: false,
            interim_results: false,
            max_alternatives: 1,
        }
    }
}

/// Error codes a host recognizer reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveErrorCode {
    #[error("no speech detected")]
    NoSpeech,
    #[error("microphone access denied")]
    NotAllowed,
    #[error("speech recognition service not allowed")]
    ServiceNotAllowed,
    #[error("audio capture failed")]
    AudioCapture,
    #[error("network error")]
    Network,
    #[error("recognition aborted")]
    Aborted,
    #[error("recognition error: {0}")]
    Other(String),
}

impl LiveErrorCode {
    /// Parse a host error string such as `no-speech`.
    pub fn parse(code: &str) -> Self {
        match code {
            "no-speech" => LiveErrorCode::NoSpeech,
            "not-allowed" => LiveErrorCode::NotAllowed,
            "service-not-allowed" => LiveErrorCode::ServiceNotAllowed,
            "audio-capture" => LiveErrorCode::AudioCapture,
            "network" => LiveErrorCode::Network,
            "aborted" => LiveErrorCode::Aborted,
            other => LiveErrorCode::Other(other.to_string()),
        }
    }

    /// Failure reason this code maps to when the user did not ask for it.
    pub fn failure_reason(&self) -> LiveFailureReason {
        match self {
            LiveErrorCode::NoSpeech => LiveFailureReason::NoSpeech,
            LiveErrorCode::NotAllowed => LiveFailureReason::NotAllowed,
            LiveErrorCode::ServiceNotAllowed
            | LiveErrorCode::AudioCapture
            | LiveErrorCode::Other(_) => LiveFailureReason::ServiceUnavailable,
            LiveErrorCode::Network => LiveFailureReason::Network,
            LiveErrorCode::Aborted => LiveFailureReason::AbortedUnexpectedly,
        }
    }
}

impl From<LiveErrorCode> for ScanSpeakError {
    fn from(code: LiveErrorCode) -> Self {
        ScanSpeakError::LiveRecognitionFailed {
            reason: code.failure_reason(),
            message: code.to_string(),
        }
    }
}

/// Events delivered by a running recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// The recognizer is listening.
    Started,
    Result { transcript: String, is_final: bool },
    Error(LiveErrorCode),
    /// The recognizer shut down. Always the last event.
    Ended,
}

/// Handle for aborting a running recognition.
pub trait LiveControl: Send + Sync {
    /// Abort recognition. Must be safe to call more than once and after the
    /// recognizer has ended.
    fn abort(&self);
}

/// A started recognition attempt.
pub struct LiveRecognition {
    pub events: mpsc::Receiver<LiveEvent>,
    pub control: Box<dyn LiveControl>,
}

/// Host speech-recognition facility.
#[async_trait]
pub trait LiveRecognizer: Send + Sync {
    /// Start one recognition attempt. An error means the facility could not
    /// start at all.
    async fn start(
        &self,
        options: LiveRecognitionOptions,
    ) -> Result<LiveRecognition, LiveErrorCode>;
}

// =============================================================================
// Mock implementation
// =============================================================================

struct MockLiveControl {
    aborted: Arc<AtomicBool>,
    abort_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl LiveControl for MockLiveControl {
    fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
        let tx = self.abort_tx.lock().ok().and_then(|mut tx| tx.take());
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
    }
}

/// Scripted recognizer for tests.
///
/// Each `start` replays the script with `event_delay` between events. An
/// abort interrupts the script with `Error(Aborted)` and `Ended`, which is
/// what hosts do. A script without `Ended` leaves the session hanging until
/// aborted, for timeout tests.
pub struct MockLiveRecognizer {
    script: Vec<LiveEvent>,
    event_delay: Duration,
    start_error: Option<LiveErrorCode>,
    aborted: Arc<AtomicBool>,
    started_with: Mutex<Vec<LiveRecognitionOptions>>,
}

impl Default for MockLiveRecognizer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockLiveRecognizer {
    pub fn new(script: Vec<LiveEvent>) -> Self {
        Self {
            script,
            event_delay: Duration::from_millis(100),
            start_error: None,
            aborted: Arc::new(AtomicBool::new(false)),
            started_with: Mutex::new(Vec::new()),
        }
    }

    /// Hears `text` and ends.
    pub fn hearing(text: &str) -> Self {
        Self::new(vec![
            LiveEvent::Started,
            LiveEvent::Result {
                transcript: text.to_string(),
                is_final: true,
            },
            LiveEvent::Ended,
        ])
    }

    /// Reports `code` and ends.
    pub fn failing_with(code: LiveErrorCode) -> Self {
        Self::new(vec![LiveEvent::Started, LiveEvent::Error(code), LiveEvent::Ended])
    }

    /// Starts and then never reports anything.
    pub fn silent() -> Self {
        Self::new(vec![LiveEvent::Started])
    }

    /// Refuses to start.
    pub fn unstartable(code: LiveErrorCode) -> Self {
        let mut mock = Self::new(Vec::new());
        mock.start_error = Some(code);
        mock
    }

    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    /// Whether any attempt was aborted.
    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Options passed to each `start`, in call order.
    pub fn started_with(&self) -> Vec<LiveRecognitionOptions> {
        self.started_with
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LiveRecognizer for MockLiveRecognizer {
    async fn start(
        &self,
        options: LiveRecognitionOptions,
    ) -> Result<LiveRecognition, LiveErrorCode> {
        if let Ok(mut started) = self.started_with.lock() {
            started.push(options);
        }
        if let Some(code) = &self.start_error {
            return Err(code.clone());
        }

        let (tx, rx) = mpsc::channel(16);
        let (abort_tx, mut abort_rx) = oneshot::channel::<()>();
        let mut pending: VecDeque<LiveEvent> = self.script.clone().into();
        let delay = self.event_delay;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut abort_rx => {
                        let _ = tx.send(LiveEvent::Error(LiveErrorCode::Aborted)).await;
                        let _ = tx.send(LiveEvent::Ended).await;
                        return;
                    }
                    _ = tokio::time::sleep(delay), if !pending.is_empty() => {
                        if let Some(event) = pending.pop_front() {
                            let ended = event == LiveEvent::Ended;
                            if tx.send(event).await.is_err() || ended {
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(LiveRecognition {
            events: rx,
            control: Box::new(MockLiveControl {
                aborted: Arc::clone(&self.aborted),
                abort_tx: Mutex::new(Some(abort_tx)),
            }),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
