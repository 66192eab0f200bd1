//! Acquisition engine: runs one session at a time through the fallback chain.
//!
//! ```text
//! start() -> capture -> remote transcription --ok--> Succeeded
//!                               |
//!                             failed -> live recognition --ok--> Succeeded
//!                                              |
//!                                            failed -> manual input
//! ```
//!
//! Each path returns a [`PathOutcome`] and `run` only routes between them.
//! `stop()` is synchronous and signals whichever phase is current through a
//! `watch` channel; the phase's own `select!` decides what stopping means.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use scanspeak_audio::{
    pick_supported_encoding, probe, AudioLevelMonitor, AudioRecorder, CaptureConstraints,
    InputStream, MediaBackend, RecorderEvent,
};
use scanspeak_core::{
    CapabilitySnapshot, EventBus, LiveFailureReason, RemoteFailureReason, Result,
    ScanSpeakConfig, ScanSpeakError, Timestamp, TranscriptionMethod, TranscriptionResult,
    VoiceEvent,
};
use scanspeak_transcribe::{AudioPayload, RemoteTranscriber};

use crate::callbacks::AcquisitionCallbacks;
use crate::live::{LiveEvent, LiveRecognition, LiveRecognitionOptions, LiveRecognizer};
use crate::manual::ManualInput;
use crate::session::{ActiveTimeout, Session};
use crate::state::{Phase, StateMachine};

const STATUS_STARTING: &str = "Starting voice recognition...";
const STATUS_REQUESTING: &str = "Requesting microphone access...";
const STATUS_RECORDING: &str = "Recording... Tap to stop";
const STATUS_RECORDING_STOPPED: &str = "Recording stopped";
const STATUS_SMALL_PAYLOAD: &str = "Very little audio was captured. Trying anyway...";
const STATUS_TRANSCRIBING: &str = "Transcribing...";
const STATUS_LIVE: &str = "Trying live speech recognition...";
const STATUS_LISTENING: &str = "Listening...";
const STATUS_MANUAL: &str = "Voice recognition failed. Please type your message.";
const STATUS_CANCELLED: &str = "Voice input cancelled";

/// Result of one path of the fallback chain.
#[derive(Debug)]
pub enum PathOutcome {
    Success(TranscriptionResult),
    /// The primary path failed and live recognition is available.
    FallbackToSecondary(ScanSpeakError),
    /// No automated path is left.
    FallbackToManual(ScanSpeakError),
    /// The user stopped the session.
    Cancelled,
    /// Surface to the caller without further fallback.
    Failed(ScanSpeakError),
}

/// How a `start()` call ended, for callers that also want a return value.
///
/// Callbacks have already been delivered when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    Transcribed(TranscriptionResult),
    /// Display string of the error passed to `on_error`.
    Failed(String),
    Cancelled,
    /// The caller was handed a [`ManualInput`].
    ManualInputRequired,
}

enum Terminal {
    Success(TranscriptionResult),
    Error(ScanSpeakError),
    Cancelled,
    Manual(String),
}

impl Terminal {
    fn phase(&self) -> Phase {
        match self {
            Terminal::Success(_) => Phase::Succeeded,
            Terminal::Error(_) => Phase::Failed,
            Terminal::Cancelled => Phase::Cancelled,
            Terminal::Manual(_) => Phase::AwaitingManualInput,
        }
    }
}

/// What `stop()` needs to reach the running session.
struct ActiveSession {
    id: Uuid,
    stop_tx: watch::Sender<Option<Phase>>,
}

/// Voice-acquisition engine.
///
/// Holds the capability snapshot, its collaborators, and a handle on the
/// current session. Share it behind an `Arc` to call [`stop`] while
/// [`start`] is pending.
///
/// [`start`]: AcquisitionEngine::start
/// [`stop`]: AcquisitionEngine::stop
pub struct AcquisitionEngine {
    config: ScanSpeakConfig,
    capabilities: CapabilitySnapshot,
    media: Arc<dyn MediaBackend>,
    transcriber: Arc<dyn RemoteTranscriber>,
    live: Option<Arc<dyn LiveRecognizer>>,
    callbacks: Arc<dyn AcquisitionCallbacks>,
    events: Option<EventBus>,
    state: StateMachine,
    active: Mutex<Option<ActiveSession>>,
}

impl AcquisitionEngine {
    /// Build an engine. Host capabilities are probed once, here.
    pub fn new(
        config: ScanSpeakConfig,
        media: Arc<dyn MediaBackend>,
        transcriber: Arc<dyn RemoteTranscriber>,
        callbacks: Arc<dyn AcquisitionCallbacks>,
    ) -> Self {
        let capabilities = probe(&media.environment());
        info!(
            audio_capture = capabilities.has_audio_capture,
            live_recognition = capabilities.has_live_recognition,
            speech_output = capabilities.has_speech_output,
            "Acquisition engine initialized"
        );
        Self {
            config,
            capabilities,
            media,
            transcriber,
            live: None,
            callbacks,
            events: None,
            state: StateMachine::new(),
            active: Mutex::new(None),
        }
    }

    pub fn with_live_recognizer(mut self, recognizer: Arc<dyn LiveRecognizer>) -> Self {
        self.live = Some(recognizer);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn capabilities(&self) -> CapabilitySnapshot {
        self.capabilities
    }

    pub fn config(&self) -> &ScanSpeakConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.current()
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Whether the secondary path may run.
    pub fn live_recognition_available(&self) -> bool {
        self.capabilities.has_live_recognition && self.config.live.enabled && self.live.is_some()
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -------------------------------------------------------------------------
    // Public operations
    // -------------------------------------------------------------------------

    /// Run one acquisition session to its terminal outcome.
    ///
    /// Fails with [`ScanSpeakError::SessionActive`] when a session is already
    /// running; every other outcome is delivered through the callbacks and
    /// summarized in the returned [`AcquisitionOutcome`].
    pub async fn start(&self) -> Result<AcquisitionOutcome> {
        if let Err(e) = self.state.transition(Phase::RequestingPermission) {
            debug!(error = %e, "Start rejected");
            return Err(ScanSpeakError::SessionActive);
        }

        let mut session = Session::new();
        let session_id = session.id();
        let (stop_tx, mut stop_rx) = watch::channel(None);
        *self.lock_active() = Some(ActiveSession {
            id: session_id,
            stop_tx,
        });
        let mut slot = SessionSlot {
            engine: self,
            armed: true,
        };

        info!(session_id = %session_id, "Acquisition session started");
        self.publish(VoiceEvent::SessionStarted {
            session_id,
            timestamp: Timestamp::now(),
        });
        self.status(session_id, STATUS_STARTING);

        let terminal = self.run(&mut session, &mut stop_rx).await;
        slot.armed = false;
        Ok(self.finish(session, terminal))
    }

    /// Stop whatever the current session is doing.
    ///
    /// While recording, capture ends and the buffered audio is still
    /// transcribed. While waiting on permission, transcription, or live
    /// recognition, the session is cancelled. No-op without a session, after
    /// a terminal outcome, or when the current phase was already stopped.
    pub fn stop(&self) {
        let active = self.lock_active();
        let Some(active) = active.as_ref() else {
            debug!("Stop ignored: no active session");
            return;
        };

        let phase = self.state.current();
        if !phase.is_stoppable() {
            debug!(session_id = %active.id, phase = %phase, "Stop ignored in this phase");
            return;
        }
        if *active.stop_tx.borrow() == Some(phase) {
            debug!(session_id = %active.id, phase = %phase, "Stop already requested");
            return;
        }

        info!(session_id = %active.id, phase = %phase, "Stop requested");
        active.stop_tx.send_replace(Some(phase));
    }

    // -------------------------------------------------------------------------
    // Orchestration
    // -------------------------------------------------------------------------

    async fn run(
        &self,
        session: &mut Session,
        stop_rx: &mut watch::Receiver<Option<Phase>>,
    ) -> Terminal {
        let payload = match self.capture(session, stop_rx).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Terminal::Cancelled,
            Err(e) => return Terminal::Error(e),
        };

        let primary_failure = match self.transcribe_remote(session.id(), payload, stop_rx).await {
            PathOutcome::Success(result) => return Terminal::Success(result),
            PathOutcome::Cancelled => return Terminal::Cancelled,
            PathOutcome::Failed(e) => return Terminal::Error(e),
            PathOutcome::FallbackToManual(e) => return Terminal::Manual(e.to_string()),
            PathOutcome::FallbackToSecondary(e) => e,
        };
        debug!(session_id = %session.id(), error = %primary_failure, "Falling back to live recognition");

        match self.recognize_live(session, stop_rx).await {
            PathOutcome::Success(result) => Terminal::Success(result),
            PathOutcome::Cancelled => Terminal::Cancelled,
            PathOutcome::Failed(e) => Terminal::Error(e),
            PathOutcome::FallbackToManual(e) | PathOutcome::FallbackToSecondary(e) => {
                Terminal::Manual(e.to_string())
            }
        }
    }

    /// Release the session, return to Idle, then deliver the outcome.
    fn finish(&self, mut session: Session, terminal: Terminal) -> AcquisitionOutcome {
        let session_id = session.id();
        let elapsed_ms = session.elapsed().as_millis() as u64;

        if let Err(e) = self.state.transition(terminal.phase()) {
            warn!(session_id = %session_id, error = %e, "Unexpected terminal transition");
        }
        let recording_started = session.recording_started();
        let stop_unreported = session.mark_recording_stop_reported();
        session.release();
        drop(session);
        self.lock_active().take();
        if self.state.transition(Phase::Idle).is_err() {
            self.state.reset();
        }

        match terminal {
            Terminal::Success(result) => {
                info!(
                    session_id = %session_id,
                    method = %result.method,
                    language = %result.language,
                    chars = result.text.chars().count(),
                    elapsed_ms,
                    "Transcription delivered"
                );
                self.publish(VoiceEvent::TranscriptionSucceeded {
                    session_id,
                    method: result.method,
                    language: result.language.clone(),
                    text_length: result.text.len(),
                    timestamp: Timestamp::now(),
                });
                self.callbacks.on_transcription_success(result.clone());
                AcquisitionOutcome::Transcribed(result)
            }
            Terminal::Error(err) => {
                error!(session_id = %session_id, error = %err, elapsed_ms, "Acquisition failed");
                let message = err.to_string();
                if recording_started && stop_unreported {
                    self.callbacks.on_recording_stop();
                }
                self.status(session_id, &err.status_message());
                self.publish(VoiceEvent::SessionFailed {
                    session_id,
                    reason: message.clone(),
                    timestamp: Timestamp::now(),
                });
                self.callbacks.on_error(err);
                AcquisitionOutcome::Failed(message)
            }
            Terminal::Cancelled => {
                info!(session_id = %session_id, elapsed_ms, "Acquisition cancelled");
                if recording_started && stop_unreported {
                    self.callbacks.on_recording_stop();
                }
                self.status(session_id, STATUS_CANCELLED);
                self.publish(VoiceEvent::SessionCancelled {
                    session_id,
                    timestamp: Timestamp::now(),
                });
                AcquisitionOutcome::Cancelled
            }
            Terminal::Manual(reason) => {
                warn!(session_id = %session_id, reason = %reason, "Automated paths exhausted; asking for manual input");
                self.publish(VoiceEvent::ManualInputRequired {
                    session_id,
                    reason: reason.clone(),
                    timestamp: Timestamp::now(),
                });
                self.status(session_id, STATUS_MANUAL);
                let input = ManualInput::new(
                    session_id,
                    self.config.manual.prompt.clone(),
                    Arc::clone(&self.callbacks),
                    self.events.clone(),
                );
                self.callbacks.on_manual_input_required(&reason, input);
                AcquisitionOutcome::ManualInputRequired
            }
        }
    }

    // -------------------------------------------------------------------------
    // Primary path: capture
    // -------------------------------------------------------------------------

    /// Record until stopped or timed out. `Ok(None)` means cancelled while
    /// waiting for permission.
    async fn capture(
        &self,
        session: &mut Session,
        stop_rx: &mut watch::Receiver<Option<Phase>>,
    ) -> Result<Option<AudioPayload>> {
        let session_id = session.id();
        if !self.capabilities.has_audio_capture {
            warn!(session_id = %session_id, "Audio capture is not supported on this host");
            return Err(ScanSpeakError::CaptureUnsupported);
        }

        self.status(session_id, STATUS_REQUESTING);
        let constraints = CaptureConstraints::from(&self.config.recording);
        let stream = tokio::select! {
            granted = self.media.request_microphone(&constraints) => granted?,
            _ = stop_signal(stop_rx, Phase::RequestingPermission) => {
                info!(session_id = %session_id, "Stopped while waiting for microphone access");
                return Ok(None);
            }
        };
        session.attach_stream(Arc::clone(&stream));
        info!(session_id = %session_id, device = stream.label(), "Microphone access granted");

        let mut recorder = self.create_recorder(session_id, &stream)?;
        let mime_type = recorder.mime_type().to_string();
        let timeslice = Duration::from_millis(self.config.recording.timeslice_ms);
        let mut recorder_events = recorder.start(timeslice)?;

        session.attach_level_monitor(AudioLevelMonitor::start(
            Arc::clone(&stream),
            Duration::from_millis(self.config.recording.level_sample_interval_ms),
        ));
        let max_duration = Duration::from_secs(self.config.recording.max_duration_secs);
        session.set_timeout(ActiveTimeout::recording(max_duration));

        self.state.transition(Phase::Recording)?;
        session.mark_recording_started();
        info!(
            session_id = %session_id,
            encoding = %mime_type,
            timeslice_ms = self.config.recording.timeslice_ms,
            "Recording started"
        );
        self.publish(VoiceEvent::RecordingStarted {
            session_id,
            encoding: mime_type.clone(),
            timestamp: Timestamp::now(),
        });
        self.callbacks.on_recording_start();
        self.status(session_id, STATUS_RECORDING);

        let mut stopping = false;
        loop {
            let timeout = session.timeout();
            tokio::select! {
                event = recorder_events.recv() => match event {
                    Some(RecorderEvent::Data(chunk)) => {
                        trace!(session_id = %session_id, bytes = chunk.len(), "Audio chunk");
                        session.push_chunk(chunk);
                    }
                    Some(RecorderEvent::Stopped) | None => break,
                    Some(RecorderEvent::Error(message)) => {
                        recorder.stop();
                        return Err(ScanSpeakError::Recording(message));
                    }
                },
                _ = timeout.expired(), if !stopping => {
                    info!(
                        session_id = %session_id,
                        max_secs = self.config.recording.max_duration_secs,
                        "Recording timeout reached"
                    );
                    session.clear_timeout();
                    recorder.stop();
                    stopping = true;
                }
                _ = stop_signal(stop_rx, Phase::Recording), if !stopping => {
                    session.mark_manually_stopped();
                    session.clear_timeout();
                    recorder.stop();
                    stopping = true;
                }
            }
        }

        if let Some(level) = session.finish_capture() {
            debug!(
                session_id = %session_id,
                peak = level.peak,
                mean = level.mean,
                samples = level.samples,
                "Input level summary"
            );
        }
        let payload = session.take_payload(&mime_type);
        let manual = session.manually_stopped();
        info!(
            session_id = %session_id,
            bytes = payload.len(),
            manually_stopped = manual,
            "Recording stopped"
        );
        self.publish(VoiceEvent::RecordingStopped {
            session_id,
            payload_bytes: payload.len(),
            manually_stopped: manual,
            timestamp: Timestamp::now(),
        });
        if session.mark_recording_stop_reported() {
            self.callbacks.on_recording_stop();
        }
        self.status(session_id, STATUS_RECORDING_STOPPED);

        if payload.is_empty() {
            return Err(ScanSpeakError::EmptyCapture);
        }
        if payload.len() < self.config.recording.small_payload_bytes {
            warn!(
                session_id = %session_id,
                bytes = payload.len(),
                threshold = self.config.recording.small_payload_bytes,
                "Very small recording; transcription may fail"
            );
            self.status(session_id, STATUS_SMALL_PAYLOAD);
        }
        Ok(Some(payload))
    }

    /// Build a recorder for the negotiated encoding, falling back to the
    /// platform default.
    fn create_recorder(
        &self,
        session_id: Uuid,
        stream: &Arc<dyn InputStream>,
    ) -> Result<Box<dyn AudioRecorder>> {
        let encoding = pick_supported_encoding(&self.config.recording.encodings, |candidate| {
            self.media.is_type_supported(candidate)
        });
        debug!(session_id = %session_id, encoding = %encoding, "Negotiated encoding");

        match self.media.create_recorder(Arc::clone(stream), &encoding) {
            Ok(recorder) => return Ok(recorder),
            Err(e) if encoding.is_empty() => {
                warn!(session_id = %session_id, error = %e, "Recorder rejected the platform default");
                return Err(ScanSpeakError::UnsupportedEncoding(
                    "platform default".to_string(),
                ));
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    encoding = %encoding,
                    error = %e,
                    "Recorder rejected negotiated encoding; trying platform default"
                );
            }
        }

        self.media
            .create_recorder(Arc::clone(stream), "")
            .map_err(|_| ScanSpeakError::UnsupportedEncoding(encoding))
    }

    // -------------------------------------------------------------------------
    // Primary path: remote transcription
    // -------------------------------------------------------------------------

    async fn transcribe_remote(
        &self,
        session_id: Uuid,
        payload: AudioPayload,
        stop_rx: &mut watch::Receiver<Option<Phase>>,
    ) -> PathOutcome {
        if let Err(e) = self.state.transition(Phase::Transcribing) {
            return PathOutcome::Failed(e);
        }
        self.status(session_id, STATUS_TRANSCRIBING);
        debug!(
            session_id = %session_id,
            bytes = payload.len(),
            mime = %payload.mime_type,
            "Sending recording for transcription"
        );

        let reply = tokio::select! {
            reply = self.transcriber.transcribe(payload) => reply,
            _ = stop_signal(stop_rx, Phase::Transcribing) => {
                info!(session_id = %session_id, "Transcription cancelled");
                return PathOutcome::Cancelled;
            }
        };

        let transcript = match reply {
            Ok(transcript) => transcript,
            Err(failure) => {
                warn!(
                    session_id = %session_id,
                    reason = %failure.reason,
                    status = ?failure.status,
                    message = %failure.message,
                    "Primary path failed"
                );
                self.publish(VoiceEvent::PrimaryPathFailed {
                    session_id,
                    reason: failure.reason,
                    message: failure.message.clone(),
                    timestamp: Timestamp::now(),
                });
                return self.after_primary_failure(failure.into());
            }
        };

        let reconciled =
            scanspeak_language::reconcile(transcript.language.as_deref(), &transcript.text);
        let Some(result) = TranscriptionResult::new(
            &transcript.text,
            reconciled.language,
            TranscriptionMethod::RemoteTranscription,
        ) else {
            let message = "Empty transcription".to_string();
            warn!(session_id = %session_id, "Primary path returned a blank transcript");
            self.publish(VoiceEvent::PrimaryPathFailed {
                session_id,
                reason: RemoteFailureReason::Unknown,
                message: message.clone(),
                timestamp: Timestamp::now(),
            });
            return self.after_primary_failure(ScanSpeakError::RemoteTranscriptionFailed {
                reason: RemoteFailureReason::Unknown,
                message,
            });
        };

        if reconciled.overridden {
            let service_language = reconciled.service_language.unwrap_or_default();
            warn!(
                session_id = %session_id,
                service = %service_language,
                heuristic = reconciled.language,
                "Service language overridden by heuristic"
            );
            self.publish(VoiceEvent::LanguageOverridden {
                session_id,
                service_language,
                heuristic_language: reconciled.language.to_string(),
                timestamp: Timestamp::now(),
            });
        }
        PathOutcome::Success(result)
    }

    fn after_primary_failure(&self, err: ScanSpeakError) -> PathOutcome {
        if self.live_recognition_available() {
            PathOutcome::FallbackToSecondary(err)
        } else {
            info!("Live recognition unavailable; skipping to manual input");
            PathOutcome::FallbackToManual(err)
        }
    }

    // -------------------------------------------------------------------------
    // Secondary path: live recognition
    // -------------------------------------------------------------------------

    async fn recognize_live(
        &self,
        session: &mut Session,
        stop_rx: &mut watch::Receiver<Option<Phase>>,
    ) -> PathOutcome {
        let session_id = session.id();
        let Some(recognizer) = self.live.as_ref().map(Arc::clone) else {
            return PathOutcome::FallbackToManual(ScanSpeakError::LiveRecognitionFailed {
                reason: LiveFailureReason::ServiceUnavailable,
                message: "no live recognizer configured".to_string(),
            });
        };
        if let Err(e) = self.state.transition(Phase::LiveRecognizing) {
            return PathOutcome::Failed(e);
        }
        self.status(session_id, STATUS_LIVE);

        let options = LiveRecognitionOptions::from(&self.config.live);
        let timeout_secs = self.config.live.timeout_secs;
        session.set_timeout(ActiveTimeout::live_recognition(Duration::from_secs(
            timeout_secs,
        )));
        let timeout = session.timeout();

        info!(session_id = %session_id, locale = %options.locale, "Starting live recognition");
        let started = tokio::select! {
            started = recognizer.start(options) => started,
            _ = timeout.expired() => {
                session.clear_timeout();
                return self.live_failed(
                    session_id,
                    LiveFailureReason::ServiceUnavailable,
                    format!("Recognizer did not start within {}s", timeout_secs),
                );
            }
            _ = stop_signal(stop_rx, Phase::LiveRecognizing) => {
                info!(session_id = %session_id, "Live recognition cancelled before it started");
                session.clear_timeout();
                return PathOutcome::Cancelled;
            }
        };
        let LiveRecognition { mut events, control } = match started {
            Ok(live) => live,
            Err(code) => {
                session.clear_timeout();
                return self.live_failed(
                    session_id,
                    LiveFailureReason::ServiceUnavailable,
                    format!("failed to start: {}", code),
                );
            }
        };
        session.attach_live_control(control);

        let outcome = loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(LiveEvent::Started) => {
                        debug!(session_id = %session_id, "Live recognition listening");
                        self.status(session_id, STATUS_LISTENING);
                    }
                    Some(LiveEvent::Result { transcript, is_final }) => {
                        if !is_final {
                            trace!(session_id = %session_id, "Ignoring interim result");
                        } else {
                            let language = scanspeak_language::classify(&transcript);
                            break match TranscriptionResult::new(
                                &transcript,
                                language,
                                TranscriptionMethod::LiveRecognition,
                            ) {
                                Some(result) => PathOutcome::Success(result),
                                None => self.live_failed(
                                    session_id,
                                    LiveFailureReason::NoSpeech,
                                    "Empty transcription".to_string(),
                                ),
                            };
                        }
                    }
                    Some(LiveEvent::Error(code)) => {
                        break self.live_failed(session_id, code.failure_reason(), code.to_string());
                    }
                    Some(LiveEvent::Ended) | None => {
                        break self.live_failed(
                            session_id,
                            LiveFailureReason::NoSpeech,
                            "Recognition ended without a result".to_string(),
                        );
                    }
                },
                _ = timeout.expired() => {
                    break self.live_failed(
                        session_id,
                        LiveFailureReason::NoSpeech,
                        format!("No result within {}s", timeout_secs),
                    );
                }
                _ = stop_signal(stop_rx, Phase::LiveRecognizing) => {
                    info!(session_id = %session_id, "Live recognition aborted by user");
                    break PathOutcome::Cancelled;
                }
            }
        };

        session.abort_live();
        session.clear_timeout();
        outcome
    }

    fn live_failed(
        &self,
        session_id: Uuid,
        reason: LiveFailureReason,
        message: String,
    ) -> PathOutcome {
        warn!(session_id = %session_id, reason = %reason, message = %message, "Live recognition failed");
        self.publish(VoiceEvent::LivePathFailed {
            session_id,
            reason,
            message: message.clone(),
            timestamp: Timestamp::now(),
        });
        PathOutcome::FallbackToManual(ScanSpeakError::LiveRecognitionFailed { reason, message })
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    fn status(&self, session_id: Uuid, status: &str) {
        self.callbacks.on_status_update(status);
        self.publish(VoiceEvent::StatusUpdated {
            session_id,
            status: status.to_string(),
            timestamp: Timestamp::now(),
        });
    }

    fn publish(&self, event: VoiceEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

impl fmt::Debug for AcquisitionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionEngine")
            .field("phase", &self.state.current())
            .field("capabilities", &self.capabilities)
            .field("live_recognizer", &self.live.is_some())
            .field("event_bus", &self.events.is_some())
            .finish()
    }
}

/// Resolves once a stop targeting `phase` has been requested.
async fn stop_signal(rx: &mut watch::Receiver<Option<Phase>>, phase: Phase) {
    let signalled = rx.wait_for(|target| *target == Some(phase)).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

/// Returns the engine to Idle if a `start()` future is dropped mid-session.
struct SessionSlot<'a> {
    engine: &'a AcquisitionEngine,
    armed: bool,
}

impl Drop for SessionSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Acquisition dropped before completion; releasing session");
            self.engine.lock_active().take();
            self.engine.state.reset();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{CallbackRecord, MockCallbacks};
    use crate::live::{LiveErrorCode, MockLiveRecognizer};
    use async_trait::async_trait;
    use scanspeak_audio::{HostEnvironment, MediaAccessError, MockMediaBackend};
    use scanspeak_transcribe::MockTranscriber;

    fn engine_with(
        media: MockMediaBackend,
        transcriber: MockTranscriber,
    ) -> (AcquisitionEngine, Arc<MockCallbacks>) {
        let callbacks = Arc::new(MockCallbacks::new());
        let engine = AcquisitionEngine::new(
            ScanSpeakConfig::default(),
            Arc::new(media),
            Arc::new(transcriber),
            Arc::clone(&callbacks) as Arc<dyn AcquisitionCallbacks>,
        );
        (engine, callbacks)
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    #[test]
    fn test_new_engine_is_idle() {
        let (engine, callbacks) = engine_with(MockMediaBackend::new(), MockTranscriber::new());
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.is_active());
        assert!(engine.capabilities().has_audio_capture);
        assert!(callbacks.records().is_empty());
    }

    #[test]
    fn test_live_availability_needs_recognizer_and_config() {
        let (engine, _) = engine_with(MockMediaBackend::new(), MockTranscriber::new());
        assert!(!engine.live_recognition_available());

        let engine = engine.with_live_recognizer(Arc::new(MockLiveRecognizer::silent()));
        assert!(engine.live_recognition_available());

        let mut config = ScanSpeakConfig::default();
        config.live.enabled = false;
        let disabled = AcquisitionEngine::new(
            config,
            Arc::new(MockMediaBackend::new()),
            Arc::new(MockTranscriber::new()),
            Arc::new(MockCallbacks::new()),
        )
        .with_live_recognizer(Arc::new(MockLiveRecognizer::silent()));
        assert!(!disabled.live_recognition_available());
    }

    // -------------------------------------------------------------------------
    // stop()
    // -------------------------------------------------------------------------

    #[test]
    fn test_stop_without_session_is_noop() {
        let (engine, callbacks) = engine_with(MockMediaBackend::new(), MockTranscriber::new());
        engine.stop();
        engine.stop();
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(callbacks.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_terminal_is_noop() {
        let (engine, callbacks) = engine_with(
            MockMediaBackend::new(),
            MockTranscriber::new().succeed("hello there", Some("en")),
        );
        engine.start().await.unwrap();
        let before = callbacks.records().len();
        engine.stop();
        assert_eq!(callbacks.records().len(), before);
    }

    // -------------------------------------------------------------------------
    // start()
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_session_active() {
        let (engine, _) = engine_with(
            MockMediaBackend::new(),
            MockTranscriber::new().succeed("hello", None),
        );
        let engine = Arc::new(engine);
        let running = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.start().await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.phase(), Phase::Recording);

        assert!(matches!(
            engine.start().await,
            Err(ScanSpeakError::SessionActive)
        ));

        engine.stop();
        let outcome = running.await.unwrap().unwrap();
        assert!(matches!(outcome, AcquisitionOutcome::Transcribed(_)));
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_no_capture_support_fails_immediately() {
        let media = MockMediaBackend::new().with_environment(HostEnvironment {
            has_live_recognition: true,
            protocol: "https".to_string(),
            ..Default::default()
        });
        let (engine, callbacks) = engine_with(media, MockTranscriber::new());

        let outcome = engine.start().await.unwrap();
        assert!(matches!(outcome, AcquisitionOutcome::Failed(_)));
        assert_eq!(callbacks.errors().len(), 1);
        assert!(callbacks.errors()[0].contains("not supported"));
        assert_eq!(callbacks.count(&CallbackRecord::RecordingStart), 0);
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_permission_errors_map_to_specific_errors() {
        let cases = [
            (MediaAccessError::NotAllowed, "permission denied"),
            (MediaAccessError::NotFound, "No microphone found"),
            (MediaAccessError::NotReadable, "busy"),
        ];
        for (err, expected) in cases {
            let (engine, callbacks) = engine_with(
                MockMediaBackend::new().with_permission_error(err),
                MockTranscriber::new(),
            );
            engine.start().await.unwrap();
            let errors = callbacks.errors();
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains(expected), "{}", errors[0]);
            assert!(callbacks.successes().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_uses_negotiated_encoding() {
        let media = Arc::new(MockMediaBackend::new().with_supported_encodings(&["audio/mp4"]));
        let transcriber = Arc::new(MockTranscriber::new().succeed("hi there", None));
        let engine = AcquisitionEngine::new(
            ScanSpeakConfig::default(),
            Arc::clone(&media) as Arc<dyn MediaBackend>,
            Arc::clone(&transcriber) as Arc<dyn RemoteTranscriber>,
            Arc::new(MockCallbacks::new()),
        );
        engine.start().await.unwrap();
        assert_eq!(media.recorder_encodings(), vec!["audio/mp4"]);
        assert_eq!(transcriber.received()[0].file_name, "recording.mp4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_supported_candidate_uses_platform_default() {
        let media = Arc::new(MockMediaBackend::new().with_supported_encodings(&[]));
        let transcriber = Arc::new(MockTranscriber::new().succeed("hi there", None));
        let engine = AcquisitionEngine::new(
            ScanSpeakConfig::default(),
            Arc::clone(&media) as Arc<dyn MediaBackend>,
            Arc::clone(&transcriber) as Arc<dyn RemoteTranscriber>,
            Arc::new(MockCallbacks::new()),
        );
        engine.start().await.unwrap();
        assert_eq!(media.recorder_encodings(), vec![""]);
        assert_eq!(transcriber.received()[0].mime_type, "audio/webm");
    }

    #[tokio::test]
    async fn test_unconstructible_recorder_is_unsupported_encoding() {
        let (engine, callbacks) = engine_with(
            MockMediaBackend::new().rejecting_recorders(),
            MockTranscriber::new(),
        );
        let outcome = engine.start().await.unwrap();
        assert!(matches!(outcome, AcquisitionOutcome::Failed(_)));
        assert!(callbacks.errors()[0].contains("No supported audio encoding"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_without_live_goes_to_manual() {
        let (engine, callbacks) = engine_with(
            MockMediaBackend::new(),
            MockTranscriber::new().fail(RemoteFailureReason::RateLimited),
        );
        let outcome = engine.start().await.unwrap();
        assert_eq!(outcome, AcquisitionOutcome::ManualInputRequired);
        assert_eq!(callbacks.manual_requests(), 1);
        assert!(callbacks.errors().is_empty());
        assert!(callbacks
            .statuses()
            .contains(&"Voice recognition failed. Please type your message.".to_string()));

        let input = callbacks.take_manual_input().unwrap();
        assert_eq!(
            input.prompt(),
            "Voice recognition failed. Please type your message in the chat input."
        );
        let result = input.submit("hello from the keyboard").unwrap();
        assert_eq!(result.method, TranscriptionMethod::Manual);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_start_failure_is_secondary_failure() {
        let (engine, callbacks) = engine_with(
            MockMediaBackend::new(),
            MockTranscriber::new().fail(RemoteFailureReason::Unknown),
        );
        let engine = engine.with_live_recognizer(Arc::new(MockLiveRecognizer::unstartable(
            LiveErrorCode::ServiceNotAllowed,
        )));
        let outcome = engine.start().await.unwrap();
        assert_eq!(outcome, AcquisitionOutcome::ManualInputRequired);
        assert!(callbacks.errors().is_empty());
    }

    /// A host facility whose start call never settles.
    struct StalledRecognizer;

    #[async_trait]
    impl LiveRecognizer for StalledRecognizer {
        async fn start(
            &self,
            _options: LiveRecognitionOptions,
        ) -> std::result::Result<LiveRecognition, LiveErrorCode> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_live_start_is_bounded_by_live_timeout() {
        let (engine, callbacks) = engine_with(
            MockMediaBackend::new(),
            MockTranscriber::new().fail(RemoteFailureReason::Unknown),
        );
        let engine = engine.with_live_recognizer(Arc::new(StalledRecognizer));
        assert!(engine.live_recognition_available());

        let begun = tokio::time::Instant::now();
        let outcome = tokio::time::timeout(Duration::from_secs(120), engine.start())
            .await
            .expect("live phase must end at its deadline")
            .unwrap();
        let elapsed = begun.elapsed();

        assert_eq!(outcome, AcquisitionOutcome::ManualInputRequired);
        // 30s recording cap, then the 15s live cap.
        assert!(elapsed >= Duration::from_secs(45));
        assert!(elapsed < Duration::from_secs(50));
        assert_eq!(callbacks.manual_requests(), 1);
        assert!(callbacks.records().iter().any(|r| matches!(
            r,
            CallbackRecord::ManualInputRequired(reason) if reason.contains("service-unavailable")
        )));
        assert!(callbacks.errors().is_empty());
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_transcribing_fires_neither_success_nor_error() {
        let (engine, callbacks) = engine_with(
            MockMediaBackend::new(),
            MockTranscriber::new()
                .succeed("too late", None)
                .with_delay(Duration::from_secs(5)),
        );
        let engine = Arc::new(engine);
        let running = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.start().await })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        engine.stop();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.phase(), Phase::Transcribing);
        engine.stop();
        engine.stop();

        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome, AcquisitionOutcome::Cancelled);
        assert!(callbacks.successes().is_empty());
        assert!(callbacks.errors().is_empty());
        assert_eq!(callbacks.count(&CallbackRecord::RecordingStop), 1);
        assert!(callbacks
            .statuses()
            .contains(&"Voice input cancelled".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_requesting_permission() {
        let (engine, callbacks) = engine_with(
            MockMediaBackend::new().with_permission_delay(Duration::from_secs(10)),
            MockTranscriber::new(),
        );
        let engine = Arc::new(engine);
        let running = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.start().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.phase(), Phase::RequestingPermission);
        engine.stop();

        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome, AcquisitionOutcome::Cancelled);
        assert_eq!(callbacks.count(&CallbackRecord::RecordingStart), 0);
        assert_eq!(callbacks.count(&CallbackRecord::RecordingStop), 0);
        assert!(callbacks.errors().is_empty());
        assert!(callbacks.statuses().contains(&STATUS_CANCELLED.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_start_future_releases_engine() {
        let (engine, _) = engine_with(MockMediaBackend::new(), MockTranscriber::new());
        let result =
            tokio::time::timeout(Duration::from_millis(500), engine.start()).await;
        assert!(result.is_err());
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.is_active());
    }
}
