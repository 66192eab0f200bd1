//! Per-attempt state owned by the engine.

use std::fmt;
use std::sync::Arc;

use tokio::time::{Duration, Instant};
use uuid::Uuid;

use scanspeak_audio::{AudioLevelMonitor, InputStream, LevelSummary, StreamGuard};
use scanspeak_transcribe::AudioPayload;

use crate::live::LiveControl;

/// The single pending deadline of a session.
///
/// Replaced on each phase change, never stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTimeout {
    #[default]
    None,
    Recording(Instant),
    LiveRecognition(Instant),
}

impl ActiveTimeout {
    pub fn recording(after: Duration) -> Self {
        ActiveTimeout::Recording(Instant::now() + after)
    }

    pub fn live_recognition(after: Duration) -> Self {
        ActiveTimeout::LiveRecognition(Instant::now() + after)
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            ActiveTimeout::None => None,
            ActiveTimeout::Recording(at) | ActiveTimeout::LiveRecognition(at) => Some(*at),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline().is_some()
    }

    /// Resolves at the deadline; never resolves for `None`.
    pub async fn expired(self) {
        match self.deadline() {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    }
}

/// Everything one acquisition attempt holds.
///
/// Hardware handles are released by [`Session::release`] or on drop: the
/// stream guard stops tracks, the level monitor aborts its task, and an
/// in-flight live recognition is aborted.
pub struct Session {
    id: Uuid,
    started_at: Instant,
    chunks: Vec<Vec<u8>>,
    stream: Option<StreamGuard>,
    level_monitor: Option<AudioLevelMonitor>,
    live_control: Option<Box<dyn LiveControl>>,
    timeout: ActiveTimeout,
    recording_started: bool,
    recording_stop_reported: bool,
    manually_stopped: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Instant::now(),
            chunks: Vec::new(),
            stream: None,
            level_monitor: None,
            live_control: None,
            timeout: ActiveTimeout::None,
            recording_started: false,
            recording_stop_reported: false,
            manually_stopped: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn timeout(&self) -> ActiveTimeout {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: ActiveTimeout) {
        self.timeout = timeout;
    }

    pub fn clear_timeout(&mut self) {
        self.timeout = ActiveTimeout::None;
    }

    pub fn attach_stream(&mut self, stream: Arc<dyn InputStream>) {
        self.stream = Some(StreamGuard::new(stream));
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn attach_level_monitor(&mut self, monitor: AudioLevelMonitor) {
        self.level_monitor = Some(monitor);
    }

    pub fn attach_live_control(&mut self, control: Box<dyn LiveControl>) {
        self.live_control = Some(control);
    }

    /// Abort and drop the in-flight live recognition, if any.
    pub fn abort_live(&mut self) {
        if let Some(control) = self.live_control.take() {
            control.abort();
        }
    }

    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Stop level sampling and release the microphone. Buffered chunks are
    /// kept.
    pub fn finish_capture(&mut self) -> Option<LevelSummary> {
        let summary = self.level_monitor.take().map(|m| m.stop());
        self.stream = None;
        self.clear_timeout();
        summary
    }

    /// Concatenate the buffered chunks into one payload.
    pub fn take_payload(&mut self, mime_type: &str) -> AudioPayload {
        AudioPayload::from_chunks(std::mem::take(&mut self.chunks), mime_type)
    }

    pub fn mark_recording_started(&mut self) {
        self.recording_started = true;
    }

    pub fn recording_started(&self) -> bool {
        self.recording_started
    }

    /// Recording ended because the user asked, not because of the timeout.
    pub fn mark_manually_stopped(&mut self) {
        self.manually_stopped = true;
    }

    pub fn manually_stopped(&self) -> bool {
        self.manually_stopped
    }

    /// Returns true the first time it is called.
    pub fn mark_recording_stop_reported(&mut self) -> bool {
        !std::mem::replace(&mut self.recording_stop_reported, true)
    }

    /// Drop every hardware handle and pending deadline.
    pub fn release(&mut self) {
        self.finish_capture();
        self.abort_live();
        self.chunks.clear();
    }

    /// True once nothing is held.
    pub fn is_released(&self) -> bool {
        self.stream.is_none()
            && self.level_monitor.is_none()
            && self.live_control.is_none()
            && !self.timeout.is_pending()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("chunks", &self.chunks.len())
            .field("buffered_bytes", &self.buffered_bytes())
            .field("has_stream", &self.stream.is_some())
            .field("live", &self.live_control.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scanspeak_audio::MockInputStream;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FlagControl(Arc<AtomicBool>);

    impl LiveControl for FlagControl {
        fn abort(&self) {
            self.0.store(true, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_timeout_deadlines() {
        assert_eq!(ActiveTimeout::None.deadline(), None);
        assert!(!ActiveTimeout::default().is_pending());
        let t = ActiveTimeout::recording(Duration::from_secs(30));
        assert!(matches!(t, ActiveTimeout::Recording(_)));
        assert!(t.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_expires_at_deadline() {
        let start = Instant::now();
        ActiveTimeout::live_recognition(Duration::from_secs(15))
            .expired()
            .await;
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[test]
    fn test_chunks_and_payload() {
        let mut session = Session::new();
        session.push_chunk(vec![1, 2]);
        session.push_chunk(Vec::new());
        session.push_chunk(vec![3]);
        assert_eq!(session.buffered_bytes(), 3);

        let payload = session.take_payload("audio/mp4");
        assert_eq!(payload.bytes, vec![1, 2, 3]);
        assert_eq!(payload.file_name, "recording.mp4");
        assert_eq!(session.buffered_bytes(), 0);
    }

    #[tokio::test]
    async fn test_release_stops_tracks_and_aborts_live() {
        let stream = Arc::new(MockInputStream::new(Some(0.5)));
        let aborted = Arc::new(AtomicBool::new(false));

        let mut session = Session::new();
        session.attach_stream(Arc::clone(&stream) as Arc<dyn InputStream>);
        session.attach_level_monitor(AudioLevelMonitor::start(
            Arc::clone(&stream) as Arc<dyn InputStream>,
            Duration::from_millis(100),
        ));
        session.attach_live_control(Box::new(FlagControl(Arc::clone(&aborted))));
        session.set_timeout(ActiveTimeout::recording(Duration::from_secs(30)));
        assert!(!session.is_released());

        session.release();
        assert!(session.is_released());
        assert!(!stream.is_live());
        assert!(aborted.load(Ordering::Relaxed));
    }

    #[test]
    fn test_drop_stops_tracks() {
        let stream = Arc::new(MockInputStream::new(None));
        {
            let mut session = Session::new();
            session.attach_stream(Arc::clone(&stream) as Arc<dyn InputStream>);
        }
        assert!(!stream.is_live());
    }

    #[test]
    fn test_recording_stop_reported_once() {
        let mut session = Session::new();
        assert!(session.mark_recording_stop_reported());
        assert!(!session.mark_recording_stop_reported());
    }
}
