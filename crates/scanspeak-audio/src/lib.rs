//! Scanspeak audio crate - host media seams, capability probing, encoding
//! negotiation, and input-level monitoring.
//!
//! The host platform (a browser, a desktop audio stack, a file replayer) is
//! reached only through the [`MediaBackend`], [`InputStream`], and
//! [`AudioRecorder`] traits. A mock implementation is included for testing
//! without real hardware.

pub mod capability;
pub mod codec;
pub mod error;
pub mod level;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant};

use scanspeak_core::config::RecordingConfig;
use scanspeak_core::error::{Result, ScanSpeakError};

pub use capability::probe;
pub use codec::{pick_supported_encoding, supported_encodings};
pub use error::MediaAccessError;
pub use level::{AudioLevelMonitor, LevelSummary};

// =============================================================================
// Types
// =============================================================================

/// Facts about the host, as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    /// A buffered recorder API exists.
    pub has_recorder: bool,
    /// A microphone-access API exists.
    pub has_media_access: bool,
    /// A live speech-recognition API exists.
    pub has_live_recognition: bool,
    /// A speech-synthesis API exists.
    pub has_speech_output: bool,
    /// Transport scheme without the trailing colon, e.g. `https`.
    pub protocol: String,
    pub hostname: String,
}

impl HostEnvironment {
    /// Secure transport, or a loopback host.
    pub fn is_secure_context(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("https") || self.hostname == "localhost"
    }
}

/// Processing hints passed with a microphone request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub sample_rate: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self::from(&RecordingConfig::default())
    }
}

impl From<&RecordingConfig> for CaptureConstraints {
    fn from(config: &RecordingConfig) -> Self {
        Self {
            echo_cancellation: config.echo_cancellation,
            noise_suppression: config.noise_suppression,
            auto_gain_control: config.auto_gain_control,
            sample_rate: config.sample_rate,
        }
    }
}

/// Events delivered by a running [`AudioRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// One timeslice worth of encoded audio.
    Data(Vec<u8>),
    /// The recorder has flushed its last chunk and stopped.
    Stopped,
    /// The recorder failed mid-capture.
    Error(String),
}

// =============================================================================
// Traits
// =============================================================================

/// A granted microphone stream.
pub trait InputStream: Send + Sync {
    /// Device label, for logging.
    fn label(&self) -> &str;

    /// Whether any track of the stream is still capturing.
    fn is_live(&self) -> bool;

    /// Current normalized input level in `[0.0, 1.0]`, or `None` when the
    /// host cannot measure it.
    fn level(&self) -> Option<f32>;

    /// Stop every track. Must be idempotent.
    fn stop_tracks(&self);
}

/// Buffered recorder bound to one [`InputStream`].
pub trait AudioRecorder: Send {
    /// Encoding the recorder actually produces.
    fn mime_type(&self) -> &str;

    /// Begin recording, delivering a chunk every `timeslice`.
    fn start(&mut self, timeslice: Duration) -> Result<mpsc::Receiver<RecorderEvent>>;

    /// Request a stop. The recorder flushes its final chunk and then sends
    /// [`RecorderEvent::Stopped`]. Calling it twice is harmless.
    fn stop(&mut self);
}

/// Entry point into the host's media facilities.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Describe the host for capability probing.
    fn environment(&self) -> HostEnvironment;

    /// Ask for microphone access. May wait on a user prompt.
    async fn request_microphone(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Arc<dyn InputStream>, MediaAccessError>;

    /// Whether the recorder can produce `encoding`; `None` when the host
    /// cannot answer the question.
    fn is_type_supported(&self, encoding: &str) -> Option<bool>;

    /// Build a recorder for `stream`. An empty `encoding` selects the host
    /// default.
    fn create_recorder(
        &self,
        stream: Arc<dyn InputStream>,
        encoding: &str,
    ) -> Result<Box<dyn AudioRecorder>>;
}

/// Stops the wrapped stream's tracks when dropped.
pub struct StreamGuard {
    stream: Arc<dyn InputStream>,
}

impl StreamGuard {
    pub fn new(stream: Arc<dyn InputStream>) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> &Arc<dyn InputStream> {
        &self.stream
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        tracing::debug!(device = self.stream.label(), "Releasing input stream");
        self.stream.stop_tracks();
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock microphone stream with a fixed input level.
#[derive(Debug)]
pub struct MockInputStream {
    live: AtomicBool,
    level: Option<f32>,
}

impl MockInputStream {
    pub fn new(level: Option<f32>) -> Self {
        Self {
            live: AtomicBool::new(true),
            level,
        }
    }
}

impl InputStream for MockInputStream {
    fn label(&self) -> &str {
        "mock-microphone"
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    fn level(&self) -> Option<f32> {
        self.level
    }

    fn stop_tracks(&self) {
        self.live.store(false, Ordering::Relaxed);
    }
}

/// Mock recorder that replays scripted chunks, one per timeslice.
///
/// Chunks not yet delivered when [`AudioRecorder::stop`] is called are
/// flushed before `Stopped`, so the full script is always observed.
pub struct MockRecorder {
    mime_type: String,
    chunks: Vec<Vec<u8>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl MockRecorder {
    pub fn new(mime_type: impl Into<String>, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            chunks,
            stop_tx: None,
        }
    }
}

impl AudioRecorder for MockRecorder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn start(&mut self, timeslice: Duration) -> Result<mpsc::Receiver<RecorderEvent>> {
        if self.stop_tx.is_some() {
            return Err(ScanSpeakError::Recording(
                "Recorder is already running".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        self.stop_tx = Some(stop_tx);
        let mut pending: VecDeque<Vec<u8>> = self.chunks.clone().into();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + timeslice, timeslice);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        for chunk in pending.drain(..) {
                            if tx.send(RecorderEvent::Data(chunk)).await.is_err() {
                                return;
                            }
                        }
                        let _ = tx.send(RecorderEvent::Stopped).await;
                        return;
                    }
                    _ = ticker.tick() => {
                        if let Some(chunk) = pending.pop_front() {
                            if tx.send(RecorderEvent::Data(chunk)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Mock media backend for testing the acquisition engine.
///
/// Every handed-out stream is remembered so tests can assert that no
/// track is left live after a session ends.
pub struct MockMediaBackend {
    environment: HostEnvironment,
    permission: std::result::Result<(), MediaAccessError>,
    permission_delay: Option<Duration>,
    supported: Option<Vec<String>>,
    chunks: Vec<Vec<u8>>,
    level: Option<f32>,
    reject_recorders: bool,
    streams: Mutex<Vec<Arc<MockInputStream>>>,
    requests: AtomicUsize,
    recorder_encodings: Mutex<Vec<String>>,
}

impl Default for MockMediaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaBackend {
    /// Fully capable secure host that grants access and supports every
    /// encoding.
    pub fn new() -> Self {
        Self {
            environment: HostEnvironment {
                has_recorder: true,
                has_media_access: true,
                has_live_recognition: true,
                has_speech_output: true,
                protocol: "https".to_string(),
                hostname: "localhost".to_string(),
            },
            permission: Ok(()),
            permission_delay: None,
            supported: None,
            chunks: vec![vec![0u8; 2048]; 4],
            level: Some(0.3),
            reject_recorders: false,
            streams: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
            recorder_encodings: Mutex::new(Vec::new()),
        }
    }

    pub fn with_environment(mut self, environment: HostEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_permission_error(mut self, err: MediaAccessError) -> Self {
        self.permission = Err(err);
        self
    }

    /// Hold the permission prompt open for `delay`.
    pub fn with_permission_delay(mut self, delay: Duration) -> Self {
        self.permission_delay = Some(delay);
        self
    }

    /// Restrict supported encodings. Without this every encoding is
    /// supported.
    pub fn with_supported_encodings(mut self, encodings: &[&str]) -> Self {
        self.supported = Some(encodings.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn with_level(mut self, level: Option<f32>) -> Self {
        self.level = level;
        self
    }

    /// Make every `create_recorder` call fail.
    pub fn rejecting_recorders(mut self) -> Self {
        self.reject_recorders = true;
        self
    }

    /// Number of microphone requests served.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Whether any stream handed out is still capturing.
    pub fn any_track_live(&self) -> bool {
        self.streams
            .lock()
            .map(|streams| streams.iter().any(|s| s.is_live()))
            .unwrap_or(false)
    }

    /// Encodings passed to `create_recorder`, in call order.
    pub fn recorder_encodings(&self) -> Vec<String> {
        self.recorder_encodings
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    fn environment(&self) -> HostEnvironment {
        self.environment.clone()
    }

    async fn request_microphone(
        &self,
        _constraints: &CaptureConstraints,
    ) -> std::result::Result<Arc<dyn InputStream>, MediaAccessError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.permission_delay {
            tokio::time::sleep(delay).await;
        }
        self.permission.clone()?;

        let stream = Arc::new(MockInputStream::new(self.level));
        if let Ok(mut streams) = self.streams.lock() {
            streams.push(Arc::clone(&stream));
        }
        tracing::info!("Mock microphone granted");
        Ok(stream)
    }

    fn is_type_supported(&self, encoding: &str) -> Option<bool> {
        match &self.supported {
            Some(list) => Some(list.iter().any(|e| e == encoding)),
            None => Some(true),
        }
    }

    fn create_recorder(
        &self,
        _stream: Arc<dyn InputStream>,
        encoding: &str,
    ) -> Result<Box<dyn AudioRecorder>> {
        if let Ok(mut calls) = self.recorder_encodings.lock() {
            calls.push(encoding.to_string());
        }
        if self.reject_recorders {
            return Err(ScanSpeakError::UnsupportedEncoding(encoding.to_string()));
        }
        let mime = if encoding.is_empty() {
            "audio/webm"
        } else {
            encoding
        };
        Ok(Box::new(MockRecorder::new(mime, self.chunks.clone())))
    }
}

// =============================================================================
// Tests
// =============================================================================
