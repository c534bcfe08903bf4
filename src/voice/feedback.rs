//! Feedback channel for spoken and displayed responses

use std::sync::{Arc, Mutex};

/// Speaks responses back to the user
///
/// `speak` is fire-and-forget: implementations report their own failures
/// and never hand them back to the caller.
pub trait Feedback: Send + Sync {
    /// Speak text aloud and mirror it to the transient display
    fn speak(&self, text: &str);

    /// Update the transient display without speaking
    fn show(&self, _text: &str) {}
}

impl<F: Feedback + ?Sized> Feedback for Arc<F> {
    fn speak(&self, text: &str) {
        (**self).speak(text);
    }

    fn show(&self, text: &str) {
        (**self).show(text);
    }
}

/// Feedback that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedback;

impl Feedback for TracingFeedback {
    fn speak(&self, text: &str) {
        tracing::info!(text, "feedback");
    }

    fn show(&self, text: &str) {
        tracing::debug!(text, "display");
    }
}

/// Feedback collected in memory
///
/// Used by HTTP handlers to return the response text to the client.
#[derive(Debug, Default, Clone)]
pub struct FeedbackLog {
    spoken: Arc<Mutex<Vec<String>>>,
    display: Arc<Mutex<Option<String>>>,
}

impl FeedbackLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything spoken so far, oldest first
    #[must_use]
    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Most recently spoken message
    #[must_use]
    pub fn last_spoken(&self) -> Option<String> {
        self.spoken.lock().ok().and_then(|s| s.last().cloned())
    }

    /// Text currently on the display
    #[must_use]
    pub fn display(&self) -> Option<String> {
        self.display.lock().ok().and_then(|d| d.clone())
    }
}

impl Feedback for FeedbackLog {
    fn speak(&self, text: &str) {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        self.show(text);
    }

    fn show(&self, text: &str) {
        if let Ok(mut display) = self.display.lock() {
            *display = Some(text.to_string());
        }
    }
}
