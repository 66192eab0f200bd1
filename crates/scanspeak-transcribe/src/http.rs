//! HTTP client for Whisper-style transcription endpoints.
//!
//! Two shapes of endpoint are supported with the same request:
//!
//! - a same-origin proxy that takes a multipart `file` field and answers
//!   `{ text, language?, success, error? }`, and
//! - the upstream API directly, in which case a bearer key is configured and
//!   `model` plus `response_format=verbose_json` are sent as well so the
//!   reply carries a language.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use scanspeak_core::config::TranscriptionConfig;
use scanspeak_core::error::{Result, ScanSpeakError};
use scanspeak_core::RemoteFailureReason;

use crate::{
    is_accepted_encoding, reason_for_status, AudioPayload, RemoteTranscriber, RemoteTranscript,
    RemoteTranscriptionFailure,
};

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Posts recordings to a transcription endpoint.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_upload_bytes: usize,
}

impl HttpTranscriber {
    /// Build a client from configuration. The API key, if any, is read from
    /// the environment variable named by `api_key_env`.
    pub fn from_config(config: &TranscriptionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(config, api_key)
    }

    pub fn new(config: &TranscriptionConfig, api_key: Option<String>) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ScanSpeakError::Config(
                "Transcription endpoint must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ScanSpeakError::Config(format!("HTTP client: {}", e)))?;

        debug!(
            endpoint = %config.endpoint,
            authenticated = api_key.is_some(),
            "Remote transcriber configured"
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Reject payloads the service would refuse, without a round-trip.
    fn validate(&self, payload: &AudioPayload) -> std::result::Result<(), RemoteTranscriptionFailure> {
        if payload.len() > self.max_upload_bytes {
            return Err(RemoteTranscriptionFailure::new(
                RemoteFailureReason::BadAudio,
                format!(
                    "Audio file too large ({} bytes, max {})",
                    payload.len(),
                    self.max_upload_bytes
                ),
            ));
        }
        if !is_accepted_encoding(payload) {
            return Err(RemoteTranscriptionFailure::new(
                RemoteFailureReason::BadAudio,
                format!("Unsupported audio format: {}", payload.mime_type),
            ));
        }
        Ok(())
    }

    fn build_form(
        &self,
        payload: AudioPayload,
    ) -> std::result::Result<reqwest::multipart::Form, RemoteTranscriptionFailure> {
        let mime = if payload.mime_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            payload.mime_type.clone()
        };
        let part = reqwest::multipart::Part::bytes(payload.bytes)
            .file_name(payload.file_name)
            .mime_str(&mime)
            .map_err(|e| {
                RemoteTranscriptionFailure::new(RemoteFailureReason::BadAudio, e.to_string())
            })?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        if self.api_key.is_some() {
            form = form
                .text("model", self.model.clone())
                .text("response_format", "verbose_json");
        }
        Ok(form)
    }
}

fn log_failure(failure: &RemoteTranscriptionFailure) {
    match failure.reason {
        RemoteFailureReason::Unauthorized => {
            error!(status = ?failure.status, message = %failure.message, "Transcription credentials rejected")
        }
        RemoteFailureReason::RateLimited => {
            warn!(status = ?failure.status, message = %failure.message, "Transcription rate limited")
        }
        RemoteFailureReason::BadAudio => {
            warn!(status = ?failure.status, message = %failure.message, "Transcription rejected audio")
        }
        RemoteFailureReason::Unknown => {
            warn!(status = ?failure.status, message = %failure.message, "Transcription failed")
        }
    }
}

/// Turn a response body into a transcript or a failure.
fn interpret(
    status: u16,
    body: &str,
) -> std::result::Result<RemoteTranscript, RemoteTranscriptionFailure> {
    let parsed: Option<TranscriptionResponse> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let message = parsed
            .and_then(|r| r.error)
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(RemoteTranscriptionFailure::new(reason_for_status(status), message)
            .with_status(status));
    }

    let Some(response) = parsed else {
        return Err(RemoteTranscriptionFailure::new(
            RemoteFailureReason::Unknown,
            "Malformed transcription response",
        )
        .with_status(status));
    };

    if response.success == Some(false) {
        let message = response
            .error
            .unwrap_or_else(|| "Transcription service reported failure".to_string());
        return Err(RemoteTranscriptionFailure::new(RemoteFailureReason::Unknown, message)
            .with_status(status));
    }

    Ok(RemoteTranscript {
        text: response.text.trim().to_string(),
        language: response.language.filter(|l| !l.trim().is_empty()),
    })
}

impl HttpTranscriber {
    async fn upload(
        &self,
        payload: AudioPayload,
    ) -> std::result::Result<RemoteTranscript, RemoteTranscriptionFailure> {
        self.validate(&payload)?;

        info!(
            bytes = payload.len(),
            mime = %payload.mime_type,
            file = %payload.file_name,
            "Uploading recording for transcription"
        );

        let form = self.build_form(payload)?;
        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            RemoteTranscriptionFailure::new(RemoteFailureReason::Unknown, e.to_string())
        })?;
        let status = response.status().as_u16();
        debug!(status, "Transcription response received");

        let body = response.text().await.map_err(|e| {
            RemoteTranscriptionFailure::new(RemoteFailureReason::Unknown, e.to_string())
                .with_status(status)
        })?;

        interpret(status, &body)
    }
}

#[async_trait]
impl RemoteTranscriber for HttpTranscriber {
    async fn transcribe(
        &self,
        payload: AudioPayload,
    ) -> std::result::Result<RemoteTranscript, RemoteTranscriptionFailure> {
        let result = self.upload(payload).await;
        match &result {
            Ok(transcript) => info!(
                chars = transcript.text.chars().count(),
                language = ?transcript.language,
                "Transcription complete"
            ),
            Err(failure) => log_failure(failure),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TranscriptionConfig {
        TranscriptionConfig {
            max_upload_bytes: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_endpoint_is_config_error() {
        let cfg = TranscriptionConfig {
            endpoint: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpTranscriber::new(&cfg, None),
            Err(ScanSpeakError::Config(_))
        ));
    }

    #[test]
    fn test_oversized_payload_rejected_before_sending() {
        let transcriber = HttpTranscriber::new(&config(), None).unwrap();
        let payload = AudioPayload::new(vec![0u8; 17], "audio/webm");
        let failure = transcriber.validate(&payload).unwrap_err();
        assert_eq!(failure.reason, RemoteFailureReason::BadAudio);
        assert!(failure.status.is_none());

        let payload = AudioPayload::new(vec![0u8; 16], "audio/webm");
        assert!(transcriber.validate(&payload).is_ok());
    }

    #[test]
    fn test_unsupported_format_rejected_before_sending() {
        let transcriber = HttpTranscriber::new(&config(), None).unwrap();
        let payload = AudioPayload {
            bytes: vec![1],
            mime_type: "video/x-matroska".to_string(),
            file_name: "recording.mkv".to_string(),
        };
        let failure = transcriber.validate(&payload).unwrap_err();
        assert_eq!(failure.reason, RemoteFailureReason::BadAudio);
    }

    #[tokio::test]
    async fn test_transcribe_rejects_invalid_payload_without_network() {
        let transcriber = HttpTranscriber::new(&config(), None).unwrap();
        let failure = transcriber
            .transcribe(AudioPayload::new(vec![0u8; 64], "audio/webm"))
            .await
            .unwrap_err();
        assert_eq!(failure.reason, RemoteFailureReason::BadAudio);
    }

    #[test]
    fn test_interpret_success() {
        let t = interpret(200, r#"{"text":"  Where is the bread ","language":"fr","success":true}"#)
            .unwrap();
        assert_eq!(t.text, "Where is the bread");
        assert_eq!(t.language.as_deref(), Some("fr"));
    }

    #[test]
    fn test_interpret_verbose_json_without_success_flag() {
        let t = interpret(200, r#"{"task":"transcribe","language":"english","text":"hi"}"#).unwrap();
        assert_eq!(t.text, "hi");
        assert_eq!(t.language.as_deref(), Some("english"));
    }

    #[test]
    fn test_interpret_error_statuses() {
        let f = interpret(429, r#"{"success":false,"error":"API rate limit exceeded"}"#).unwrap_err();
        assert_eq!(f.reason, RemoteFailureReason::RateLimited);
        assert_eq!(f.status, Some(429));
        assert_eq!(f.message, "API rate limit exceeded");

        let f = interpret(400, "not json").unwrap_err();
        assert_eq!(f.reason, RemoteFailureReason::BadAudio);
        assert_eq!(f.message, "HTTP 400");

        let f = interpret(500, "{}").unwrap_err();
        assert_eq!(f.reason, RemoteFailureReason::Unknown);
    }

    #[test]
    fn test_interpret_reported_failure_on_200() {
        let f = interpret(200, r#"{"success":false,"error":"No speech detected"}"#).unwrap_err();
        assert_eq!(f.reason, RemoteFailureReason::Unknown);
        assert_eq!(f.message, "No speech detected");
    }

    #[test]
    fn test_interpret_malformed_body() {
        let f = interpret(200, "<html>").unwrap_err();
        assert_eq!(f.reason, RemoteFailureReason::Unknown);
    }

    #[test]
    fn test_blank_language_is_dropped() {
        let t = interpret(200, r#"{"text":"hola","language":" "}"#).unwrap();
        assert_eq!(t.language, None);
    }
}
