//! Acquisition phases with thread-safe, validated transitions.
//!
//! Forward path:
//! - Idle -> RequestingPermission -> Recording -> Transcribing -> Succeeded
//! - Transcribing -> LiveRecognizing -> Succeeded (primary path failed)
//! - Transcribing | LiveRecognizing -> AwaitingManualInput (automated paths exhausted)
//!
//! Early exits:
//! - RequestingPermission | Recording | Transcribing | LiveRecognizing -> Failed
//! - RequestingPermission | Transcribing | LiveRecognizing -> Cancelled
//!
//! Every terminal phase returns to Idle once the session is released.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use scanspeak_core::error::{Result, ScanSpeakError};

/// Where an acquisition session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No session. Ready to start.
    Idle,
    /// Waiting for the host to grant microphone access.
    RequestingPermission,
    /// Buffering encoded audio.
    Recording,
    /// Waiting on the remote transcription service.
    Transcribing,
    /// Running the host's live speech recognition.
    LiveRecognizing,
    /// Both automated paths failed; the caller collects typed text.
    AwaitingManualInput,
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "Idle",
            Phase::RequestingPermission => "RequestingPermission",
            Phase::Recording => "Recording",
            Phase::Transcribing => "Transcribing",
            Phase::LiveRecognizing => "LiveRecognizing",
            Phase::AwaitingManualInput => "AwaitingManualInput",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
            Phase::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

impl Phase {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &Phase) -> bool {
        use Phase::*;
        matches!(
            (self, target),
            (Idle, RequestingPermission)
                | (RequestingPermission, Recording)
                | (Recording, Transcribing)
                | (Transcribing, Succeeded)
                | (Transcribing, LiveRecognizing)
                | (Transcribing, AwaitingManualInput)
                | (LiveRecognizing, Succeeded)
                | (LiveRecognizing, AwaitingManualInput)
                // Failures
                | (RequestingPermission, Failed)
                | (Recording, Failed)
                | (Transcribing, Failed)
                | (LiveRecognizing, Failed)
                // Cancellation
                | (RequestingPermission, Cancelled)
                | (Transcribing, Cancelled)
                | (LiveRecognizing, Cancelled)
                // Release
                | (Succeeded, Idle)
                | (Failed, Idle)
                | (Cancelled, Idle)
                | (AwaitingManualInput, Idle)
        )
    }

    /// Phases that end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Succeeded | Phase::Failed | Phase::Cancelled | Phase::AwaitingManualInput
        )
    }

    /// Phases in which `stop()` has something to act on.
    pub fn is_stoppable(&self) -> bool {
        matches!(
            self,
            Phase::RequestingPermission
                | Phase::Recording
                | Phase::Transcribing
                | Phase::LiveRecognizing
        )
    }
}

/// Thread-safe state machine for acquisition phases.
///
/// Clones share the same underlying phase.
#[derive(Debug, Clone)]
pub struct StateMachine {
    phase: Arc<Mutex<Phase>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            phase: Arc::new(Mutex::new(Phase::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        // A poisoned phase is still a valid phase.
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the current phase.
    pub fn current(&self) -> Phase {
        *self.lock()
    }

    /// Attempt to transition to `target`.
    pub fn transition(&self, target: Phase) -> Result<()> {
        let mut phase = self.lock();
        if phase.can_transition_to(&target) {
            tracing::debug!("Acquisition phase: {} -> {}", *phase, target);
            *phase = target;
            Ok(())
        } else {
            Err(ScanSpeakError::InvalidTransition {
                from: phase.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Force the machine back to Idle (used for error recovery).
    pub fn reset(&self) {
        let mut phase = self.lock();
        if *phase != Phase::Idle {
            tracing::warn!("Acquisition state machine reset to Idle from {}", *phase);
        }
        *phase = Phase::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================
