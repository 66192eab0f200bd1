//! One-shot inspection of what the host can do.

use scanspeak_core::CapabilitySnapshot;
use tracing::{debug, warn};

use crate::HostEnvironment;

/// Report which capture and recognition facilities `env` offers.
///
/// Never fails: anything missing is simply `false`. Live recognition also
/// requires a secure transport (`https`) or a `localhost` host.
pub fn probe(env: &HostEnvironment) -> CapabilitySnapshot {
    let has_audio_capture = env.has_recorder && env.has_media_access;

    let secure = env.is_secure_context();
    if env.has_live_recognition && !secure {
        warn!(
            protocol = %env.protocol,
            hostname = %env.hostname,
            "Live recognition present but transport is insecure; disabling it"
        );
    }
    let has_live_recognition = env.has_live_recognition && secure;

    let snapshot = CapabilitySnapshot {
        has_audio_capture,
        has_live_recognition,
        has_speech_output: env.has_speech_output,
    };
    debug!(?snapshot, "Capability probe complete");
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_env() -> HostEnvironment {
        HostEnvironment {
            has_recorder: true,
            has_media_access: true,
            has_live_recognition: true,
            has_speech_output: true,
            protocol: "https".to_string(),
            hostname: "shop.example.com".to_string(),
        }
    }

    #[test]
    fn test_full_environment() {
        let caps = probe(&full_env());
        assert!(caps.has_audio_capture);
        assert!(caps.has_live_recognition);
        assert!(caps.has_speech_output);
    }

    #[test]
    fn test_capture_needs_recorder_and_media_access() {
        let env = HostEnvironment {
            has_recorder: false,
            ..full_env()
        };
        assert!(!probe(&env).has_audio_capture);

        let env = HostEnvironment {
            has_media_access: false,
            ..full_env()
        };
        assert!(!probe(&env).has_audio_capture);
    }

    #[test]
    fn test_live_recognition_requires_secure_transport() {
        let env = HostEnvironment {
            protocol: "http".to_string(),
            ..full_env()
        };
        assert!(!probe(&env).has_live_recognition);

        let env = HostEnvironment {
            protocol: "http".to_string(),
            hostname: "localhost".to_string(),
            ..full_env()
        };
        assert!(probe(&env).has_live_recognition);
    }

    #[test]
    fn test_empty_environment() {
        let caps = probe(&HostEnvironment::default());
        assert_eq!(caps, CapabilitySnapshot::default());
    }
}
