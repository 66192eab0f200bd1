use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ScanSpeakError};

/// Encodings tried by the codec negotiator, most preferred first.
pub const DEFAULT_ENCODINGS: [&str; 6] = [
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/mp4",
    "audio/wav",
    "audio/ogg;codecs=opus",
    "audio/ogg",
];

/// Top-level configuration for the voice-acquisition engine.
///
/// Loaded from `~/.scanspeak/config.toml` by default. Every section falls
/// back to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSpeakConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub live: LiveRecognitionConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub manual: ManualInputConfig,
}

impl ScanSpeakConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScanSpeakConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ScanSpeakError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Buffered capture settings for the primary path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Hard cap on a single recording, in seconds.
    pub max_duration_secs: u64,
    /// Recorder chunk interval in milliseconds.
    pub timeslice_ms: u64,
    /// Payloads smaller than this are logged as suspicious but still sent.
    pub small_payload_bytes: usize,
    /// Candidate encodings in preference order.
    pub encodings: Vec<String>,
    /// Requested capture sample rate in Hz.
    pub sample_rate: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    /// How often the level monitor samples input energy, in milliseconds.
    pub level_sample_interval_ms: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 30,
            timeslice_ms: 250,
            small_payload_bytes: 1000,
            encodings: DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect(),
            sample_rate: 44_100,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            level_sample_interval_ms: 100,
        }
    }
}

/// Live-recognition (secondary path) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveRecognitionConfig {
    /// Whether the secondary path may be attempted at all.
    pub enabled: bool,
    /// Upper bound for one live-recognition session, in seconds.
    pub timeout_secs: u64,
    /// BCP-47 locale handed to the recognizer.
    pub locale: String,
}

impl Default for LiveRecognitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 15,
            locale: "en-US".to_string(),
        }
    }
}

/// Remote transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Endpoint that accepts a multipart `file` upload.
    pub endpoint: String,
    /// Environment variable holding an optional bearer token.
    pub api_key_env: String,
    /// Model name sent along with the upload when a key is configured.
    pub model: String,
    /// Largest payload accepted by the service, in bytes.
    pub max_upload_bytes: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/speech".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "whisper-1".to_string(),
            max_upload_bytes: 25 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Manual-entry fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualInputConfig {
    /// Reason shown to the user when typing is the only option left.
    pub prompt: String,
}

impl Default for ManualInputConfig {
    fn default() -> Self {
        Self {
            prompt: "Voice recognition failed. Please type your message in the chat input."
                .to_string(),
        }
    }
}
