//! Voice commands
//!
//! Utterances flow from a listening session ([`VoiceController`]) through
//! the interpreter ([`interpret`]) into an [`ItemSink`]. Quantity and
//! category extraction are pure and usable on their own.

mod capture;
mod category;
mod command;
mod feedback;
mod playback;
mod quantity;
mod session;
mod spectrum;
mod stt;
mod tts;

pub use capture::{AudioCapture, CpalMicrophone, SAMPLE_RATE, resample, samples_to_wav};
pub use category::{CATEGORY_KEYWORDS, Category, classify};
pub use command::{
    AddIntent, Clarification, CommandOutcome, CommandProcessor, Destination, Interpretation,
    ItemSink, UtteranceHandler, interpret,
};
pub use feedback::{Feedback, FeedbackLog, TracingFeedback};
pub use playback::{AudioPlayback, SpokenFeedback, decode_mp3};
pub use quantity::{CANONICAL_UNITS, ParsedQuantity, extract, is_quantity_phrase, normalize_unit};
pub use session::{
    AudioStream, DEFAULT_ACTIVITY_THRESHOLD, DEFAULT_SILENCE_TIMEOUT, Microphone, SessionConfig,
    TickOutcome, Transcriber, VoiceController, run_until_idle,
};
pub use spectrum::{BAR_COUNT, BIN_COUNT, FFT_SIZE, SpectrumAnalyser, level_bars};
pub use stt::{SpeechToText, WhisperTranscriber};
pub use tts::TextToSpeech;
