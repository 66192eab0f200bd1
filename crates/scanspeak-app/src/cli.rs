//! CLI argument definitions for the Scanspeak binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::file_source::DEFAULT_CHUNK_BYTES;

/// Scanspeak - voice acquisition with remote transcription and fallbacks.
#[derive(Parser, Debug)]
#[command(name = "scanspeak", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Detect the language of a piece of text.
    Classify {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List recorder encodings in preference order.
    Encodings {
        /// Encodings the recorder supports, comma separated. When given, the
        /// negotiated choice is printed too.
        #[arg(short = 's', long = "supported", value_delimiter = ',')]
        supported: Vec<String>,
    },

    /// Run one acquisition, replaying an audio file as the microphone.
    Listen {
        /// Encoded audio file to replay.
        #[arg(short = 'f', long = "file")]
        file: PathBuf,

        /// MIME type of the file. Guessed from the extension if omitted.
        #[arg(short = 'm', long = "mime")]
        mime: Option<String>,

        /// Transcription endpoint, overriding the config file.
        #[arg(short = 'e', long = "endpoint")]
        endpoint: Option<String>,

        /// Bytes replayed per recorder timeslice.
        #[arg(long = "chunk-bytes", default_value_t = DEFAULT_CHUNK_BYTES)]
        chunk_bytes: usize,
    },

    /// Write the default configuration to the resolved config path.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long = "force")]
        force: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SCANSPEAK_CONFIG env var > platform default (~/.scanspeak/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SCANSPEAK_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".scanspeak").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".scanspeak").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_joins_words() {
        let args = CliArgs::try_parse_from(["scanspeak", "classify", "hola", "amigo"]).unwrap();
        assert_eq!(
            args.command,
            Command::Classify {
                text: vec!["hola".to_string(), "amigo".to_string()]
            }
        );
    }

    #[test]
    fn test_classify_requires_text() {
        assert!(CliArgs::try_parse_from(["scanspeak", "classify"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "scanspeak",
            "listen",
            "--file",
            "clip.webm",
            "-c",
            "/tmp/s.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/s.toml"));
        assert_eq!(args.resolve_log_level("info"), "debug");
        match args.command {
            Command::Listen {
                file,
                mime,
                endpoint,
                chunk_bytes,
            } => {
                assert_eq!(file, PathBuf::from("clip.webm"));
                assert!(mime.is_none());
                assert!(endpoint.is_none());
                assert_eq!(chunk_bytes, DEFAULT_CHUNK_BYTES);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = CliArgs::try_parse_from(["scanspeak", "encodings"]).unwrap();
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }

    #[test]
    fn test_supported_encodings_split_on_comma() {
        let args =
            CliArgs::try_parse_from(["scanspeak", "encodings", "-s", "audio/mp4,audio/wav"])
                .unwrap();
        assert_eq!(
            args.command,
            Command::Encodings {
                supported: vec!["audio/mp4".to_string(), "audio/wav".to_string()]
            }
        );
    }
}
