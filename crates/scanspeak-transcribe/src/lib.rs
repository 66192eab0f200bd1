//! Scanspeak transcribe crate - the remote transcription seam.
//!
//! Buffered recordings are uploaded as a single payload to a
//! Whisper-style service. [`RemoteTranscriber`] is the trait the engine
//! talks to; [`HttpTranscriber`] is the real client and
//! [`MockTranscriber`] a scripted stand-in for tests.

pub mod http;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use scanspeak_core::{RemoteFailureReason, ScanSpeakError};

pub use http::HttpTranscriber;

/// Encodings the service accepts, matched against the MIME type.
pub const ACCEPTED_ENCODINGS: [&str; 6] = ["webm", "mp4", "wav", "ogg", "mpeg", "m4a"];

// =============================================================================
// Types
// =============================================================================

/// One recording, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Filename hint sent with the upload; services sniff the extension.
    pub file_name: String,
}

impl AudioPayload {
    /// Concatenate recorded chunks into a payload for `mime_type`.
    pub fn from_chunks(chunks: Vec<Vec<u8>>, mime_type: &str) -> Self {
        let bytes = chunks.concat();
        Self::new(bytes, mime_type)
    }

    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Self {
        Self {
            bytes,
            mime_type: mime_type.to_string(),
            file_name: file_name_for(mime_type).to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Upload filename for a recorder MIME type.
pub fn file_name_for(mime_type: &str) -> &'static str {
    let mime = mime_type.to_ascii_lowercase();
    if mime.contains("webm") {
        "recording.webm"
    } else if mime.contains("mp4") {
        "recording.mp4"
    } else {
        "recording.wav"
    }
}

/// Whether the service will accept `payload`'s encoding.
pub fn is_accepted_encoding(payload: &AudioPayload) -> bool {
    let mime = payload.mime_type.to_ascii_lowercase();
    let extension = payload
        .file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    ACCEPTED_ENCODINGS
        .iter()
        .any(|enc| mime.contains(enc) || extension == *enc)
}

/// Text returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTranscript {
    pub text: String,
    /// Language reported by the service, if any.
    pub language: Option<String>,
}

/// Why a remote transcription attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote transcription failed ({reason}): {message}")]
pub struct RemoteTranscriptionFailure {
    pub reason: RemoteFailureReason,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteTranscriptionFailure {
    pub fn new(reason: RemoteFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<RemoteTranscriptionFailure> for ScanSpeakError {
    fn from(err: RemoteTranscriptionFailure) -> Self {
        ScanSpeakError::RemoteTranscriptionFailed {
            reason: err.reason,
            message: err.message,
        }
    }
}

/// Map an HTTP status to a failure reason.
pub fn reason_for_status(status: u16) -> RemoteFailureReason {
    match status {
        400 | 413 | 415 | 422 => RemoteFailureReason::BadAudio,
        429 => RemoteFailureReason::RateLimited,
        401 | 403 => RemoteFailureReason::Unauthorized,
        _ => RemoteFailureReason::Unknown,
    }
}

// =============================================================================
// Traits
// =============================================================================

/// A service that turns a recorded payload into text.
#[async_trait]
pub trait RemoteTranscriber: Send + Sync {
    async fn transcribe(
        &self,
        payload: AudioPayload,
    ) -> Result<RemoteTranscript, RemoteTranscriptionFailure>;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Scripted transcriber for tests.
///
/// Replies are consumed in order; once the script is exhausted every call
/// fails with [`RemoteFailureReason::Unknown`]. Received payloads are kept
/// for inspection.
#[derive(Default)]
pub struct MockTranscriber {
    replies: Mutex<VecDeque<Result<RemoteTranscript, RemoteTranscriptionFailure>>>,
    received: Mutex<Vec<AudioPayload>>,
    delay: Option<Duration>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn succeed(self, text: &str, language: Option<&str>) -> Self {
        self.push(Ok(RemoteTranscript {
            text: text.to_string(),
            language: language.map(str::to_string),
        }))
    }

    /// Queue a failed reply.
    pub fn fail(self, reason: RemoteFailureReason) -> Self {
        self.push(Err(RemoteTranscriptionFailure::new(
            reason,
            format!("scripted {} failure", reason),
        )))
    }

    /// Hold every reply for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn push(self, reply: Result<RemoteTranscript, RemoteTranscriptionFailure>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    /// Payloads received so far.
    pub fn received(&self) -> Vec<AudioPayload> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RemoteTranscriber for MockTranscriber {
    async fn transcribe(
        &self,
        payload: AudioPayload,
    ) -> Result<RemoteTranscript, RemoteTranscriptionFailure> {
        if let Ok(mut received) = self.received.lock() {
            received.push(payload);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        reply.unwrap_or_else(|| {
            Err(RemoteTranscriptionFailure::new(
                RemoteFailureReason::Unknown,
                "no scripted reply",
            ))
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
