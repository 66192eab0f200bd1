use thiserror::Error;

use crate::types::{LiveFailureReason, RemoteFailureReason};

/// Top-level error type for the voice-acquisition engine.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for ScanSpeakError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScanSpeakError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("No microphone found")]
    NoDeviceFound,

    #[error("Microphone is busy or unreadable")]
    DeviceBusy,

    #[error("No supported audio encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Capture produced no audio data")]
    EmptyCapture,

    #[error("Remote transcription failed ({reason}): {message}")]
    RemoteTranscriptionFailed {
        reason: RemoteFailureReason,
        message: String,
    },

    #[error("Live recognition failed ({reason}): {message}")]
    LiveRecognitionFailed {
        reason: LiveFailureReason,
        message: String,
    },

    #[error("Manual input required: {reason}")]
    ManualFallbackRequired { reason: String },

    #[error("Audio capture is not supported on this host")]
    CaptureUnsupported,

    #[error("Microphone access failed: {0}")]
    MediaAccess(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("An acquisition session is already active")]
    SessionActive,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ScanSpeakError {
    /// Short, specific status string suitable for direct display.
    pub fn status_message(&self) -> String {
        match self {
            ScanSpeakError::PermissionDenied => {
                "Microphone permission denied. Please enable microphone access in your settings."
                    .to_string()
            }
            ScanSpeakError::NoDeviceFound => {
                "No microphone found. Please connect a microphone and try again.".to_string()
            }
            ScanSpeakError::DeviceBusy => {
                "Microphone is already in use by another application.".to_string()
            }
            ScanSpeakError::UnsupportedEncoding(_) => {
                "No supported audio format found for recording.".to_string()
            }
            ScanSpeakError::EmptyCapture => {
                "No audio was recorded. Please check that your microphone is not muted."
                    .to_string()
            }
            ScanSpeakError::RemoteTranscriptionFailed { reason, .. } => match reason {
                RemoteFailureReason::BadAudio => {
                    "The recording could not be transcribed (invalid audio).".to_string()
                }
                RemoteFailureReason::RateLimited => {
                    "Transcription service is busy. Please try again later.".to_string()
                }
                RemoteFailureReason::Unauthorized => {
                    "Transcription service rejected our credentials.".to_string()
                }
                RemoteFailureReason::Unknown => "Transcription service failed.".to_string(),
            },
            ScanSpeakError::LiveRecognitionFailed { reason, .. } => match reason {
                LiveFailureReason::NoSpeech => {
                    "No speech detected. Please try speaking more clearly.".to_string()
                }
                LiveFailureReason::NotAllowed => {
                    "Microphone access denied for speech recognition.".to_string()
                }
                LiveFailureReason::ServiceUnavailable => {
                    "Speech recognition service not available.".to_string()
                }
                LiveFailureReason::Network => {
                    "Network error during speech recognition.".to_string()
                }
                LiveFailureReason::AbortedUnexpectedly => {
                    "Speech recognition stopped unexpectedly.".to_string()
                }
            },
            ScanSpeakError::ManualFallbackRequired { .. } => {
                "Voice recognition failed. Please type your message.".to_string()
            }
            ScanSpeakError::CaptureUnsupported => {
                "Voice recording is not supported here. Please type your message.".to_string()
            }
            ScanSpeakError::MediaAccess(msg) => format!("Microphone access failed: {}", msg),
            ScanSpeakError::Recording(msg) => format!("Recording failed: {}", msg),
            ScanSpeakError::SessionActive => "Voice input is already in progress.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this error is resolved by the fallback chain rather than
    /// being surfaced to the caller.
    pub fn drives_fallback(&self) -> bool {
        matches!(
            self,
            ScanSpeakError::RemoteTranscriptionFailed { .. }
                | ScanSpeakError::LiveRecognitionFailed { .. }
        )
    }
}

impl From<toml::de::Error> for ScanSpeakError {
    fn from(err: toml::de::Error) -> Self {
        ScanSpeakError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanSpeakError {
    fn from(err: toml::ser::Error) -> Self {
        ScanSpeakError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ScanSpeakError {
    fn from(err: serde_json::Error) -> Self {
        ScanSpeakError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for scanspeak operations.
pub type Result<T> = std::result::Result<T, ScanSpeakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanSpeakError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_remote_failure_display_includes_reason() {
        let err = ScanSpeakError::RemoteTranscriptionFailed {
            reason: RemoteFailureReason::RateLimited,
            message: "429 Too Many Requests".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("rate-limited"));
        assert!(display.contains("429"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScanSpeakError = io_err.into();
        assert!(matches!(err, ScanSpeakError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: ScanSpeakError = err.unwrap_err().into();
        assert!(matches!(err, ScanSpeakError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: ScanSpeakError = err.unwrap_err().into();
        assert!(matches!(err, ScanSpeakError::Serialization(_)));
    }

    #[test]
    fn test_status_messages_are_specific() {
        let cases: Vec<(ScanSpeakError, &str)> = vec![
            (ScanSpeakError::PermissionDenied, "permission denied"),
            (ScanSpeakError::NoDeviceFound, "No microphone found"),
            (ScanSpeakError::DeviceBusy, "already in use"),
            (
                ScanSpeakError::UnsupportedEncoding("none".into()),
                "No supported audio format",
            ),
            (ScanSpeakError::EmptyCapture, "No audio was recorded"),
            (
                ScanSpeakError::ManualFallbackRequired {
                    reason: "both failed".into(),
                },
                "Please type your message",
            ),
        ];

        for (err, expected) in cases {
            let msg = err.status_message();
            assert!(msg.contains(expected), "{:?} -> {}", err, msg);
            assert_ne!(msg, "Something went wrong");
        }
    }

    #[test]
    fn test_drives_fallback() {
        assert!(ScanSpeakError::RemoteTranscriptionFailed {
            reason: RemoteFailureReason::Unknown,
            message: String::new(),
        }
        .drives_fallback());
        assert!(ScanSpeakError::LiveRecognitionFailed {
            reason: LiveFailureReason::Network,
            message: String::new(),
        }
        .drives_fallback());
        assert!(!ScanSpeakError::PermissionDenied.drives_fallback());
        assert!(!ScanSpeakError::EmptyCapture.drives_fallback());
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
