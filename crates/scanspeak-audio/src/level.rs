//! Input-level sampling while a recording is armed.
//!
//! The monitor is diagnostic only: it never stops or fails a recording. Its
//! summary lets the engine log a warning when the microphone is apparently
//! muted (every sample was zero).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::InputStream;

/// Aggregate of the samples taken during one recording.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelSummary {
    /// Highest normalized level seen, in `[0.0, 1.0]`.
    pub peak: f32,
    /// Mean of all samples.
    pub mean: f32,
    /// Number of samples taken.
    pub samples: u32,
    /// False when the stream never reported a level.
    pub available: bool,
}

impl LevelSummary {
    /// True when levels were readable and never rose above zero.
    pub fn is_silent(&self) -> bool {
        self.available && self.samples > 0 && self.peak <= 0.0
    }
}

#[derive(Debug, Default)]
struct LevelStats {
    peak: f32,
    sum: f64,
    samples: u32,
}

/// Periodically samples [`InputStream::level`] on a background task.
///
/// The task is aborted when the monitor is stopped or dropped.
pub struct AudioLevelMonitor {
    stats: Arc<Mutex<LevelStats>>,
    handle: JoinHandle<()>,
}

impl AudioLevelMonitor {
    /// Start sampling `stream` every `interval`.
    pub fn start(stream: Arc<dyn InputStream>, interval: Duration) -> Self {
        let stats = Arc::new(Mutex::new(LevelStats::default()));
        let task_stats = Arc::clone(&stats);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !stream.is_live() {
                    debug!("Input stream ended; level monitor exiting");
                    break;
                }
                let Some(level) = stream.level() else {
                    trace!("Input level unavailable");
                    continue;
                };
                let level = level.clamp(0.0, 1.0);
                if let Ok(mut s) = task_stats.lock() {
                    s.peak = s.peak.max(level);
                    s.sum += f64::from(level);
                    s.samples += 1;
                }
            }
        });

        Self { stats, handle }
    }

    /// Stop sampling and return what was observed.
    pub fn stop(&self) -> LevelSummary {
        self.handle.abort();
        let summary = match self.stats.lock() {
            Ok(s) if s.samples > 0 => LevelSummary {
                peak: s.peak,
                mean: (s.sum / f64::from(s.samples)) as f32,
                samples: s.samples,
                available: true,
            },
            _ => LevelSummary::default(),
        };
        if summary.is_silent() {
            warn!("No input level detected; the microphone may be muted");
        }
        summary
    }
}

impl Drop for AudioLevelMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
