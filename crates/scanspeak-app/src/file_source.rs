//! Media backend that replays an encoded audio file as if it were a
//! microphone recording.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use scanspeak_audio::{
    AudioRecorder, CaptureConstraints, HostEnvironment, InputStream, MediaAccessError,
    MediaBackend, RecorderEvent,
};
use scanspeak_core::{Result, ScanSpeakError};

/// Bytes delivered per recorder timeslice.
pub const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

/// Guess a recorder MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "webm" => "audio/webm",
        "mp4" | "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "mp3" | "mpeg" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

struct FileInputStream {
    label: String,
    live: AtomicBool,
}

impl InputStream for FileInputStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    fn level(&self) -> Option<f32> {
        None
    }

    fn stop_tracks(&self) {
        self.live.store(false, Ordering::Relaxed);
    }
}

/// Replays file bytes one chunk per timeslice and stops by itself at the
/// end of the file.
struct FileRecorder {
    mime_type: String,
    chunks: Vec<Vec<u8>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl AudioRecorder for FileRecorder {
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
        let mut pending: VecDeque<Vec<u8>> = std::mem::take(&mut self.chunks).into();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(timeslice);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => match pending.pop_front() {
                        Some(chunk) => {
                            if tx.send(RecorderEvent::Data(chunk)).await.is_err() {
                                return;
                            }
                        }
                        None => break,
                    },
                }
            }
            for chunk in pending.drain(..) {
                if tx.send(RecorderEvent::Data(chunk)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(RecorderEvent::Stopped).await;
        });

        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Serves one audio file as the "microphone".
///
/// Live recognition is reported as absent, so a failed remote transcription
/// goes straight to manual input.
pub struct FileMediaBackend {
    path: PathBuf,
    mime_type: String,
    bytes: Vec<u8>,
    chunk_bytes: usize,
}

impl FileMediaBackend {
    /// Read `path` up front. `mime_type` defaults to a guess from the
    /// extension.
    pub fn open(path: &Path, mime_type: Option<&str>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime_type = mime_type
            .map(str::to_string)
            .unwrap_or_else(|| mime_for_path(path).to_string());
        info!(
            path = %path.display(),
            bytes = bytes.len(),
            mime = %mime_type,
            "Audio file loaded for replay"
        );
        Ok(Self {
            path: path.to_path_buf(),
            mime_type,
            bytes,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        })
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn chunks(&self) -> Vec<Vec<u8>> {
        self.bytes
            .chunks(self.chunk_bytes)
            .map(<[u8]>::to_vec)
            .collect()
    }
}

#[async_trait]
impl MediaBackend for FileMediaBackend {
    fn environment(&self) -> HostEnvironment {
        HostEnvironment {
            has_recorder: true,
            has_media_access: true,
            has_live_recognition: false,
            has_speech_output: false,
            protocol: "file".to_string(),
            hostname: "localhost".to_string(),
        }
    }

    async fn request_microphone(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Arc<dyn InputStream>, MediaAccessError> {
        debug!(?constraints, "Capture constraints ignored for file replay");
        Ok(Arc::new(FileInputStream {
            label: self.path.display().to_string(),
            live: AtomicBool::new(true),
        }))
    }

    fn is_type_supported(&self, encoding: &str) -> Option<bool> {
        Some(encoding.eq_ignore_ascii_case(&self.mime_type))
    }

    fn create_recorder(
        &self,
        _stream: Arc<dyn InputStream>,
        encoding: &str,
    ) -> Result<Box<dyn AudioRecorder>> {
        if !encoding.is_empty() && !encoding.eq_ignore_ascii_case(&self.mime_type) {
            return Err(ScanSpeakError::UnsupportedEncoding(encoding.to_string()));
        }
        Ok(Box::new(FileRecorder {
            mime_type: self.mime_type.clone(),
            chunks: self.chunks(),
            stop_tx: None,
        }))
    }
}
