use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ISO-639-1-like language tag ("en", "es", "zh").
pub type LanguageTag = &'static str;

// =============================================================================
// Enums
// =============================================================================

/// Which acquisition path produced a transcription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptionMethod {
    /// Buffered capture sent to the remote transcription service.
    RemoteTranscription,
    /// Host-provided live speech recognition.
    LiveRecognition,
    /// Text typed by the user after both automated paths failed.
    Manual,
}

impl TranscriptionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionMethod::RemoteTranscription => "remote-transcription",
            TranscriptionMethod::LiveRecognition => "live-recognition",
            TranscriptionMethod::Manual => "manual",
        }
    }
}

impl fmt::Display for TranscriptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the remote transcription step failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteFailureReason {
    /// The service rejected the payload as invalid or corrupt audio.
    BadAudio,
    /// Quota or rate limit exceeded.
    RateLimited,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Network errors, server errors, malformed responses.
    Unknown,
}

impl fmt::Display for RemoteFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteFailureReason::BadAudio => "bad-audio",
            RemoteFailureReason::RateLimited => "rate-limited",
            RemoteFailureReason::Unauthorized => "unauthorized",
            RemoteFailureReason::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Why the live-recognition step failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiveFailureReason {
    /// The facility heard nothing usable (includes empty results and timeouts).
    NoSpeech,
    /// Microphone or recognition service access was refused.
    NotAllowed,
    /// The facility is missing, insecure, failed to start, or lost its capture device.
    ServiceUnavailable,
    /// Network error while the facility talked to its backend.
    Network,
    /// The facility aborted on its own, without a user request.
    AbortedUnexpectedly,
}

impl fmt::Display for LiveFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LiveFailureReason::NoSpeech => "no-speech",
            LiveFailureReason::NotAllowed => "not-allowed",
            LiveFailureReason::ServiceUnavailable => "service-unavailable",
            LiveFailureReason::Network => "network",
            LiveFailureReason::AbortedUnexpectedly => "aborted-unexpectedly",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Structs
// =============================================================================

/// The outcome of one successful acquisition attempt.
///
/// Produced exactly once per successful session and owned by the caller
/// after emission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Trimmed, non-empty transcript.
    pub text: String,
    /// ISO-639-1-like language tag (e.g. "en", "es", "zh").
    pub language: String,
    /// Path that produced the text.
    pub method: TranscriptionMethod,
}

impl TranscriptionResult {
    /// Build a result from raw text. Returns `None` when the text is blank.
    pub fn new(
        text: &str,
        language: impl Into<String>,
        method: TranscriptionMethod,
    ) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            language: language.into(),
            method,
        })
    }
}

/// Which capture and recognition facilities the host offers.
///
/// Computed once when the engine is built and read-only afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySnapshot {
    /// A recorder and a media-access API are both present.
    pub has_audio_capture: bool,
    /// A live-recognition API is present and the transport allows using it.
    pub has_live_recognition: bool,
    /// A speech-output API is present.
    pub has_speech_output: bool,
}

impl CapabilitySnapshot {
    /// True when at least one automated capture path can run.
    pub fn supports_voice_input(&self) -> bool {
        self.has_audio_capture || self.has_live_recognition
    }
}

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_kebab_case() {
        let json = serde_json::to_string(&TranscriptionMethod::RemoteTranscription).unwrap();
        assert_eq!(json, "\"remote-transcription\"");
        let json = serde_json::to_string(&TranscriptionMethod::LiveRecognition).unwrap();
        assert_eq!(json, "\"live-recognition\"");
        let json = serde_json::to_string(&TranscriptionMethod::Manual).unwrap();
        assert_eq!(json, "\"manual\"");
    }

    #[test]
    fn test_method_display_matches_serde() {
        for method in [
            TranscriptionMethod::RemoteTranscription,
            TranscriptionMethod::LiveRecognition,
            TranscriptionMethod::Manual,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json.trim_matches('"'), method.to_string());
        }
    }

    #[test]
    fn test_result_trims_text() {
        let result =
            TranscriptionResult::new("  hello  ", "en", TranscriptionMethod::Manual).unwrap();
        assert_eq!(result.text, "hello");
        assert_eq!(result.language, "en");
    }

    #[test]
    fn test_result_rejects_blank_text() {
        assert!(TranscriptionResult::new("", "en", TranscriptionMethod::Manual).is_none());
        assert!(TranscriptionResult::new(" \n\t ", "en", TranscriptionMethod::Manual).is_none());
    }

    #[test]
    fn test_capability_snapshot_default_is_empty() {
        let caps = CapabilitySnapshot::default();
        assert!(!caps.has_audio_capture);
        assert!(!caps.has_live_recognition);
        assert!(!caps.has_speech_output);
        assert!(!caps.supports_voice_input());
    }

    #[test]
    fn test_capability_snapshot_voice_input() {
        let caps = CapabilitySnapshot {
            has_live_recognition: true,
            ..Default::default()
        };
        assert!(caps.supports_voice_input());
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(RemoteFailureReason::RateLimited.to_string(), "rate-limited");
        assert_eq!(LiveFailureReason::AbortedUnexpectedly.to_string(), "aborted-unexpectedly");
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = Timestamp::now();
        assert_eq!(ts.to_datetime().timestamp_millis(), ts.0);
    }
}
