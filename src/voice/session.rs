//! Listening session lifecycle
//!
//! [`VoiceController`] owns one microphone stream at a time. A periodic
//! [`tick`](VoiceController::tick) meters the captured audio and ends the
//! session after a stretch of silence; the accumulated transcript is handed
//! to an [`UtteranceHandler`] exactly once when the session ends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::command::UtteranceHandler;
use super::feedback::Feedback;
use super::spectrum::{BAR_COUNT, SpectrumAnalyser, level_bars};
use crate::Result;

/// Default silence window before auto-stop
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default normalized energy that counts as voice activity
pub const DEFAULT_ACTIVITY_THRESHOLD: f32 = 0.1;

/// Source of audio streams
pub trait Microphone: Send {
    /// Open an input stream
    ///
    /// # Errors
    ///
    /// Returns error if the device is missing or access is denied
    fn acquire(&mut self) -> Result<Box<dyn AudioStream>>;
}

/// An open audio input
pub trait AudioStream: Send {
    /// Samples captured since the last call
    fn take_samples(&mut self) -> Vec<f32>;

    fn sample_rate(&self) -> u32;

    /// Stop capturing and close the device
    fn release(&mut self);
}

/// Speech recognition fed incrementally with captured audio
pub trait Transcriber: Send {
    /// Prepare for a new capture
    ///
    /// # Errors
    ///
    /// Returns error if recognition cannot start
    fn begin(&mut self, sample_rate: u32) -> Result<()>;

    /// Feed samples, returning any transcript segment finalized so far
    fn accept(&mut self, samples: &[f32]) -> Option<String>;

    /// End the capture, returning the trailing segment
    fn halt(&mut self) -> Option<String>;
}

/// Silence detection parameters
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub silence_timeout: Duration,
    pub activity_threshold: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
        }
    }
}

/// Result of one sampling tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No session was active
    Idle,
    /// Still listening at this normalized level
    Listening { level: f32 },
    /// Silence exceeded the timeout and the session ended
    AutoStopped,
}

/// Drives one listening session at a time
pub struct VoiceController {
    microphone: Box<dyn Microphone>,
    transcriber: Box<dyn Transcriber>,
    handler: Box<dyn UtteranceHandler>,
    feedback: Arc<dyn Feedback>,
    config: SessionConfig,
    stream: Option<Box<dyn AudioStream>>,
    last_voice_activity: Option<Instant>,
    analyser: SpectrumAnalyser,
    levels: [f32; BAR_COUNT],
    transcript: Vec<String>,
}

impl VoiceController {
    #[must_use]
    pub fn new(
        microphone: Box<dyn Microphone>,
        transcriber: Box<dyn Transcriber>,
        handler: Box<dyn UtteranceHandler>,
        feedback: Arc<dyn Feedback>,
        config: SessionConfig,
    ) -> Self {
        Self {
            microphone,
            transcriber,
            handler,
            feedback,
            config,
            stream: None,
            last_voice_activity: None,
            analyser: SpectrumAnalyser::new(),
            levels: [0.0; BAR_COUNT],
            transcript: Vec::new(),
        }
    }

    /// Start listening
    ///
    /// Returns `false` if a session was already active or the microphone
    /// could not be opened. Failures are reported through feedback.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.stream.is_some() {
            tracing::debug!("start ignored, already listening");
            return false;
        }

        let mut stream = match self.microphone.acquire() {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "error accessing microphone");
                self.feedback.speak("Error accessing microphone");
                return false;
            }
        };

        if let Err(e) = self.transcriber.begin(stream.sample_rate()) {
            tracing::error!(error = %e, "failed to start transcription");
            stream.release();
            self.feedback.speak("Error starting speech recognition");
            return false;
        }

        self.analyser.reset();
        self.levels = [0.0; BAR_COUNT];
        self.transcript.clear();
        self.last_voice_activity = Some(now);
        self.stream = Some(stream);

        tracing::info!("listening started");
        self.feedback.show("Listening...");
        true
    }

    /// Sample the stream once, auto-stopping after enough silence
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let Some(stream) = self.stream.as_mut() else {
            return TickOutcome::Idle;
        };

        let samples = stream.take_samples();
        if !samples.is_empty() {
            self.analyser.push(&samples);
            if let Some(segment) = self.transcriber.accept(&samples) {
                self.push_transcript(&segment);
            }
        }

        let level = self.analyser.normalized_level();
        self.levels = level_bars(level);

        let last = self.last_voice_activity.get_or_insert(now);
        if level > self.config.activity_threshold {
            *last = now;
        } else if now.saturating_duration_since(*last) > self.config.silence_timeout {
            tracing::debug!(
                silent_ms = now.saturating_duration_since(*last).as_millis(),
                "silence timeout"
            );
            self.stop();
            return TickOutcome::AutoStopped;
        }

        TickOutcome::Listening { level }
    }

    /// Stop listening and dispatch the transcript
    ///
    /// Idempotent: returns `false` when no session was active.
    pub fn stop(&mut self) -> bool {
        let Some(mut stream) = self.stream.take() else {
            return false;
        };

        if let Some(segment) = self.transcriber.halt() {
            self.append_segment(&segment);
        }
        stream.release();

        self.analyser.reset();
        self.levels = [0.0; BAR_COUNT];
        self.last_voice_activity = None;

        let utterance = std::mem::take(&mut self.transcript).join(" ");
        tracing::info!(transcript_len = utterance.len(), "listening stopped");

        if !utterance.is_empty() {
            self.handler.handle(&utterance.to_lowercase());
        }

        true
    }

    /// Append a finalized transcript segment to the current session
    pub fn push_transcript(&mut self, segment: &str) {
        if self.stream.is_some() {
            self.append_segment(segment);
        }
    }

    fn append_segment(&mut self, segment: &str) {
        let segment = segment.trim();
        if !segment.is_empty() {
            tracing::debug!(segment, "transcript segment");
            self.transcript.push(segment.to_string());
        }
    }

    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.stream.is_some()
    }

    /// Current level display, all zero while idle
    #[must_use]
    pub const fn levels(&self) -> [f32; BAR_COUNT] {
        self.levels
    }
}

/// Tick `controller` every `interval` until the session ends
///
/// Setting `cancel` stops the session manually on the next tick.
pub fn run_until_idle(controller: &mut VoiceController, interval: Duration, cancel: &AtomicBool) {
    while controller.is_listening() {
        if cancel.load(Ordering::Relaxed) {
            controller.stop();
            break;
        }

        if controller.tick(Instant::now()) == TickOutcome::AutoStopped {
            break;
        }

        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::Error;
    use crate::voice::FeedbackLog;

    #[derive(Default, Clone)]
    struct Counters {
        acquired: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
    }

    struct FakeMicrophone {
        counters: Counters,
        chunks: Vec<Vec<f32>>,
        deny: bool,
    }

    impl Microphone for FakeMicrophone {
        fn acquire(&mut self) -> Result<Box<dyn AudioStream>> {
            if self.deny {
                return Err(Error::Microphone("permission denied".to_string()));
            }
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                chunks: std::mem::take(&mut self.chunks).into(),
                released: Arc::clone(&self.counters.released),
            }))
        }
    }

    struct FakeStream {
        chunks: VecDeque<Vec<f32>>,
        released: Arc<AtomicUsize>,
    }

    impl AudioStream for FakeStream {
        fn take_samples(&mut self) -> Vec<f32> {
            self.chunks.pop_front().unwrap_or_default()
        }

        fn sample_rate(&self) -> u32 {
            16_000
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct FakeTranscriber {
        trailing: Option<String>,
    }

    impl Transcriber for FakeTranscriber {
        fn begin(&mut self, _sample_rate: u32) -> Result<()> {
            Ok(())
        }

        fn accept(&mut self, _samples: &[f32]) -> Option<String> {
            None
        }

        fn halt(&mut self) -> Option<String> {
            self.trailing.take()
        }
    }

    #[derive(Default, Clone)]
    struct RecordingHandler(Arc<Mutex<Vec<String>>>);

    impl UtteranceHandler for RecordingHandler {
        fn handle(&mut self, utterance: &str) {
            self.0.lock().unwrap().push(utterance.to_string());
        }
    }

    struct Harness {
        controller: VoiceController,
        counters: Counters,
        handled: RecordingHandler,
        feedback: FeedbackLog,
    }

    fn harness(chunks: Vec<Vec<f32>>, trailing: Option<&str>, deny: bool) -> Harness {
        let counters = Counters::default();
        let handled = RecordingHandler::default();
        let feedback = FeedbackLog::new();

        let controller = VoiceController::new(
            Box::new(FakeMicrophone {
                counters: counters.clone(),
                chunks,
                deny,
            }),
            Box::new(FakeTranscriber {
                trailing: trailing.map(str::to_string),
            }),
            Box::new(handled.clone()),
            Arc::new(feedback.clone()),
            SessionConfig::default(),
        );

        Harness {
            controller,
            counters,
            handled,
            feedback,
        }
    }

    fn noise(len: usize) -> Vec<f32> {
        let mut state = 7u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                #[allow(clippy::cast_precision_loss)]
                let unit = (state >> 8) as f32 / (1u32 << 24) as f32;
                unit - 0.5
            })
            .collect()
    }

    #[test]
    fn test_start_shows_listening() {
        let mut h = harness(Vec::new(), None, false);

        assert!(h.controller.start(Instant::now()));
        assert!(h.controller.is_listening());
        assert_eq!(h.feedback.display().as_deref(), Some("Listening..."));
        assert_eq!(h.counters.acquired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_while_listening_is_ignored() {
        let mut h = harness(Vec::new(), None, false);
        let now = Instant::now();

        assert!(h.controller.start(now));
        assert!(!h.controller.start(now));
        assert_eq!(h.counters.acquired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_microphone_failure_stays_idle() {
        let mut h = harness(Vec::new(), None, true);

        assert!(!h.controller.start(Instant::now()));
        assert!(!h.controller.is_listening());
        assert_eq!(
            h.feedback.last_spoken().as_deref(),
            Some("Error accessing microphone")
        );
        assert_eq!(h.controller.tick(Instant::now()), TickOutcome::Idle);
    }

    #[test]
    fn test_auto_stop_after_silence_exactly_once() {
        let mut h = harness(Vec::new(), Some("Add 2 KG rice to inventory"), false);
        let t0 = Instant::now();

        assert!(h.controller.start(t0));
        assert!(matches!(
            h.controller.tick(t0 + Duration::from_millis(500)),
            TickOutcome::Listening { .. }
        ));
        assert!(matches!(
            h.controller.tick(t0 + Duration::from_millis(1000)),
            TickOutcome::Listening { .. }
        ));
        assert_eq!(
            h.controller.tick(t0 + Duration::from_millis(1001)),
            TickOutcome::AutoStopped
        );
        assert_eq!(
            h.controller.tick(t0 + Duration::from_millis(1500)),
            TickOutcome::Idle
        );
        assert!(!h.controller.stop());

        assert_eq!(h.counters.released.load(Ordering::SeqCst), 1);
        assert_eq!(
            *h.handled.0.lock().unwrap(),
            vec!["add 2 kg rice to inventory".to_string()]
        );
    }

    #[test]
    fn test_voice_activity_extends_session() {
        let mut h = harness(vec![Vec::new(), noise(1024)], None, false);
        let t0 = Instant::now();

        assert!(h.controller.start(t0));
        h.controller.tick(t0 + Duration::from_millis(400));

        let loud = h.controller.tick(t0 + Duration::from_millis(800));
        let TickOutcome::Listening { level } = loud else {
            panic!("expected listening, got {loud:?}");
        };
        assert!(level > DEFAULT_ACTIVITY_THRESHOLD);
        assert!(h.controller.levels()[0] > 0.0);

        // Past the original deadline but within the window of the refresh
        assert!(matches!(
            h.controller.tick(t0 + Duration::from_millis(1500)),
            TickOutcome::Listening { .. }
        ));
    }

    #[test]
    fn test_manual_stop_is_immediate_and_idempotent() {
        let mut h = harness(Vec::new(), None, false);
        let t0 = Instant::now();

        assert!(h.controller.start(t0));
        h.controller.push_transcript("Add two bottles of milk");
        h.controller.push_transcript(" to shopping list ");

        assert!(h.controller.stop());
        assert!(!h.controller.stop());

        assert!(!h.controller.is_listening());
        assert_eq!(h.controller.levels(), [0.0; BAR_COUNT]);
        assert_eq!(h.counters.released.load(Ordering::SeqCst), 1);
        assert_eq!(
            *h.handled.0.lock().unwrap(),
            vec!["add two bottles of milk to shopping list".to_string()]
        );
    }

    #[test]
    fn test_empty_transcript_is_not_dispatched() {
        let mut h = harness(Vec::new(), None, false);

        assert!(h.controller.start(Instant::now()));
        h.controller.push_transcript("   ");
        assert!(h.controller.stop());

        assert!(h.handled.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_transcript_ignored_while_idle() {
        let mut h = harness(Vec::new(), None, false);
        h.controller.push_transcript("add 2 kg rice to inventory");

        assert!(h.controller.start(Instant::now()));
        assert!(h.controller.stop());
        assert!(h.handled.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_run_until_idle_honours_cancel() {
        let mut h = harness(Vec::new(), None, false);
        assert!(h.controller.start(Instant::now()));

        let cancel = AtomicBool::new(true);
        run_until_idle(&mut h.controller, Duration::from_millis(1), &cancel);

        assert!(!h.controller.is_listening());
        assert_eq!(h.counters.released.load(Ordering::SeqCst), 1);
    }
}
