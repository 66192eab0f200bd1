//! Scanspeak core crate - shared types, errors, configuration, and domain events
//! for the voice-acquisition engine.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::ScanSpeakConfig;
pub use error::{Result, ScanSpeakError};
pub use events::{EventBus, VoiceEvent};
pub use types::*;
