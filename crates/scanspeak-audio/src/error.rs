use scanspeak_core::ScanSpeakError;
use thiserror::Error;

/// Failure reported by the host when microphone access is requested.
///
/// Variant names follow the host's own failure kinds; the engine converts
/// them into the user-facing [`ScanSpeakError`] kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaAccessError {
    /// The user or a policy refused microphone access.
    #[error("microphone access not allowed")]
    NotAllowed,

    /// No input device is attached.
    #[error("no input device found")]
    NotFound,

    /// The device exists but another application holds it.
    #[error("input device could not be read")]
    NotReadable,

    /// The host has no media-access facility at all.
    #[error("media access unsupported")]
    Unsupported,

    #[error("{0}")]
    Other(String),
}

impl From<MediaAccessError> for ScanSpeakError {
    fn from(err: MediaAccessError) -> Self {
        match err {
            MediaAccessError::NotAllowed => ScanSpeakError::PermissionDenied,
            MediaAccessError::NotFound => ScanSpeakError::NoDeviceFound,
            MediaAccessError::NotReadable => ScanSpeakError::DeviceBusy,
            MediaAccessError::Unsupported => ScanSpeakError::CaptureUnsupported,
            MediaAccessError::Other(msg) => ScanSpeakError::MediaAccess(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_map_to_specific_kinds() {
        assert!(matches!(
            ScanSpeakError::from(MediaAccessError::NotAllowed),
            ScanSpeakError::PermissionDenied
        ));
        assert!(matches!(
            ScanSpeakError::from(MediaAccessError::NotFound),
            ScanSpeakError::NoDeviceFound
        ));
        assert!(matches!(
            ScanSpeakError::from(MediaAccessError::NotReadable),
            ScanSpeakError::DeviceBusy
        ));
        assert!(matches!(
            ScanSpeakError::from(MediaAccessError::Unsupported),
            ScanSpeakError::CaptureUnsupported
        ));
        match ScanSpeakError::from(MediaAccessError::Other("overconstrained".into())) {
            ScanSpeakError::MediaAccess(msg) => assert_eq!(msg, "overconstrained"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
