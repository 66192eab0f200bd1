//! Terminal front end for one acquisition.
//!
//! Status lines go to stderr and the transcript to stdout, so the binary
//! can be piped. Manual fallback reads one line from stdin.

use std::sync::Mutex;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use scanspeak_core::{ScanSpeakError, TranscriptionResult};
use scanspeak_language::display_label;
use scanspeak_voice::{AcquisitionCallbacks, ManualInput};

/// One-line summary printed after a transcript.
pub fn describe(result: &TranscriptionResult) -> String {
    format!(
        "{} [{}] via {}",
        display_label(&result.language),
        result.language,
        result.method
    )
}

#[derive(Default)]
pub struct ConsoleCallbacks {
    manual_reply: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stdin reader started by a manual-input request, if any. The
    /// caller awaits it before exiting.
    pub fn take_manual_reply(&self) -> Option<JoinHandle<()>> {
        self.manual_reply
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

impl AcquisitionCallbacks for ConsoleCallbacks {
    fn on_transcription_success(&self, result: TranscriptionResult) {
        println!("{}", result.text);
        eprintln!("{}", describe(&result));
    }

    fn on_error(&self, error: ScanSpeakError) {
        eprintln!("error: {}", error.status_message());
    }

    fn on_status_update(&self, status: &str) {
        eprintln!("{}", status);
    }

    fn on_manual_input_required(&self, reason: &str, input: ManualInput) {
        tracing::info!(reason, "Waiting for typed input");
        eprintln!("{}", input.prompt());
        eprint!("> ");

        let reader = tokio::spawn(async move {
            let mut line = String::new();
            let mut stdin = BufReader::new(tokio::io::stdin());
            match stdin.read_line(&mut line).await {
                Ok(_) => {
                    if input.submit(&line).is_none() {
                        eprintln!("No input given.");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read typed input");
                    input.cancel();
                }
            }
        });

        *self
            .manual_reply
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(reader);
    }
}
