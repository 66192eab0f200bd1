//! Scanspeak voice crate - the acquisition state machine.
//!
//! [`AcquisitionEngine`] captures speech, sends it to a remote transcriber,
//! falls back to host live recognition when that fails, and finally hands
//! the caller a [`ManualInput`] when neither automated path produced text.

pub mod callbacks;
pub mod engine;
pub mod live;
pub mod manual;
pub mod session;
pub mod state;

pub use callbacks::{AcquisitionCallbacks, CallbackRecord, MockCallbacks};
pub use engine::{AcquisitionEngine, AcquisitionOutcome, PathOutcome};
pub use live::{
    LiveControl, LiveErrorCode, LiveEvent, LiveRecognition, LiveRecognitionOptions,
    LiveRecognizer, MockLiveRecognizer,
};
pub use manual::ManualInput;
pub use session::{ActiveTimeout, Session};
pub use state::{Phase, StateMachine};
