//! Speech-to-text via the `OpenAI` Whisper API

use tokio::runtime::Handle;

use super::capture::{SAMPLE_RATE, resample, samples_to_wav};
use super::session::Transcriber;
use crate::{Error, Result};

const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Captures shorter than this are not worth uploading
const MIN_CAPTURE_SECS: f32 = 0.25;

/// Audio past this point is dropped so uploads stay well under Whisper's file limit
const MAX_CAPTURE_SECS: u32 = 120;

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes recorded speech
#[derive(Clone)]
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl SpeechToText {
    /// Create a Whisper client
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            url: WHISPER_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Transcribe WAV audio to text
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects the audio
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text.trim().to_string())
    }
}

/// Buffers a whole capture and transcribes it when the session halts
///
/// Must be driven from a blocking thread; `halt` waits on the runtime.
pub struct WhisperTranscriber {
    handle: Handle,
    stt: SpeechToText,
    sample_rate: u32,
    samples: Vec<f32>,
    truncated: bool,
}

impl WhisperTranscriber {
    #[must_use]
    pub const fn new(handle: Handle, stt: SpeechToText) -> Self {
        Self {
            handle,
            stt,
            sample_rate: SAMPLE_RATE,
            samples: Vec::new(),
            truncated: false,
        }
    }

    fn max_samples(&self) -> usize {
        usize::try_from(self.sample_rate.saturating_mul(MAX_CAPTURE_SECS)).unwrap_or(usize::MAX)
    }

    fn encode(&self, samples: &[f32]) -> Result<Vec<u8>> {
        let resampled = resample(samples, self.sample_rate, SAMPLE_RATE)?;
        samples_to_wav(&resampled, SAMPLE_RATE)
    }
}

impl Transcriber for WhisperTranscriber {
    fn begin(&mut self, sample_rate: u32) -> Result<()> {
        self.sample_rate = sample_rate;
        self.samples.clear();
        self.truncated = false;
        Ok(())
    }

    fn accept(&mut self, samples: &[f32]) -> Option<String> {
        let room = self.max_samples().saturating_sub(self.samples.len());
        if samples.len() > room && !self.truncated {
            tracing::warn!(
                max_secs = MAX_CAPTURE_SECS,
                "capture too long, dropping the rest"
            );
            self.truncated = true;
        }

        self.samples.extend_from_slice(&samples[..samples.len().min(room)]);
        None
    }

    fn halt(&mut self) -> Option<String> {
        let samples = std::mem::take(&mut self.samples);

        #[allow(clippy::cast_precision_loss)]
        let seconds = samples.len() as f32 / self.sample_rate.max(1) as f32;
        if seconds < MIN_CAPTURE_SECS {
            tracing::debug!(seconds, "capture too short to transcribe");
            return None;
        }

        let result = self
            .encode(&samples)
            .and_then(|wav| self.handle.block_on(self.stt.transcribe(&wav)));

        match result {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                tracing::error!(error = %e, "transcription failed");
                None
            }
        }
    }
}
