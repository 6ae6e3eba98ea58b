use std::sync::{Arc, Mutex, PoisonError};

/// Seam for the live speech-to-text stream behind the current question.
///
/// The transcript is advisory while recording and only final once `stop`
/// returns. Implementations use interior mutability so the UI side and the
/// orchestrator can share one handle.
pub trait AnswerCapture: Send + Sync {
    /// Begin capturing a fresh answer, discarding any previous transcript.
    fn start(&self);
    /// Finalize and return the transcript. Safe to call when already stopped.
    fn stop(&self) -> String;
    /// The transcript accumulated so far.
    fn transcript(&self) -> String;
}

#[derive(Debug, Default)]
struct CaptureState {
    segments: Vec<String>,
    recording: bool,
}

/// Transcript sink fed by whatever recognizer the runtime wires in (the CLI
/// feeds it stdin lines). Segments pushed while stopped are dropped.
#[derive(Debug, Clone, Default)]
pub struct TranscriptBuffer {
    inner: Arc<Mutex<CaptureState>>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one recognized segment to the live transcript.
    pub fn push_segment(&self, segment: &str) {
        let segment = segment.trim();
        if segment.is_empty() {
            return;
        }
        let mut state = self.lock();
        if !state.recording {
            tracing::debug!("dropping transcript segment: capture is stopped");
            return;
        }
        state.segments.push(segment.to_string());
    }

    pub fn is_recording(&self) -> bool {
        self.lock().recording
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CaptureState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AnswerCapture for TranscriptBuffer {
    fn start(&self) {
        let mut state = self.lock();
        state.segments.clear();
        state.recording = true;
    }

    fn stop(&self) -> String {
        let mut state = self.lock();
        state.recording = false;
        state.segments.join(" ")
    }

    fn transcript(&self) -> String {
        self.lock().segments.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_accumulate_while_recording() {
        let buffer = TranscriptBuffer::new();
        buffer.start();
        buffer.push_segment("built the");
        buffer.push_segment("  backend  ");
        assert_eq!(buffer.transcript(), "built the backend");
        assert_eq!(buffer.stop(), "built the backend");
    }

    #[test]
    fn pushes_are_dropped_when_stopped() {
        let buffer = TranscriptBuffer::new();
        buffer.push_segment("before start");
        assert_eq!(buffer.transcript(), "");

        buffer.start();
        buffer.push_segment("counted");
        buffer.stop();
        buffer.push_segment("after stop");
        assert_eq!(buffer.transcript(), "counted");
    }

    #[test]
    fn start_discards_previous_answer() {
        let buffer = TranscriptBuffer::new();
        buffer.start();
        buffer.push_segment("first answer");
        buffer.stop();

        buffer.start();
        assert_eq!(buffer.transcript(), "");
        buffer.push_segment("second answer");
        assert_eq!(buffer.stop(), "second answer");
    }

    #[test]
    fn stop_is_idempotent() {
        let buffer = TranscriptBuffer::new();
        buffer.start();
        buffer.push_segment("once");
        assert_eq!(buffer.stop(), "once");
        assert_eq!(buffer.stop(), "once");
        assert!(!buffer.is_recording());
    }
}
