//! Spoken feedback through the default output device

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::runtime::Handle;

use super::capture::resample;
use super::feedback::Feedback;
use super::tts::TextToSpeech;
use crate::{Error, Result};

/// Plays decoded audio on the default output device
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioPlayback;

impl AudioPlayback {
    /// Decode MP3 bytes and play them to completion
    ///
    /// Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3(self, mp3_data: &[u8]) -> Result<()> {
        let (samples, rate) = decode_mp3(mp3_data)?;
        self.play(&samples, rate)
    }

    /// Play mono samples recorded at `rate`
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available or the stream fails
    pub fn play(self, samples: &[f32], rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| Error::Audio(e.to_string()))?
            .config();

        let output_rate = config.sample_rate.0;
        let channels = usize::from(config.channels.max(1));
        let samples = Arc::new(resample(samples, rate, output_rate)?);

        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);

            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for frame in data.chunks_mut(channels) {
                            let pos = position.load(Ordering::Relaxed);
                            let sample = samples.get(pos).copied().unwrap_or_else(|| {
                                finished.store(true, Ordering::Relaxed);
                                0.0
                            });
                            frame.fill(sample);
                            if pos < samples.len() {
                                position.store(pos + 1, Ordering::Relaxed);
                            }
                        }
                    },
                    |err| {
                        tracing::error!(error = %err, "audio playback error");
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (samples.len() as u64 * 1000) / u64::from(output_rate.max(1));
        let timeout = Duration::from_millis(duration_ms + 500);
        let start = Instant::now();

        while !finished.load(Ordering::Relaxed) && start.elapsed() < timeout {
            std::thread::sleep(Duration::from_millis(50));
        }

        // Let the device drain its last buffer
        std::thread::sleep(Duration::from_millis(100));
        drop(stream);

        tracing::debug!(samples = samples.len(), "playback complete");
        Ok(())
    }
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                rate = u32::try_from(frame.sample_rate).unwrap_or_default();
                let channels = frame.channels.max(1);

                #[allow(clippy::cast_precision_loss)]
                samples.extend(frame.data.chunks(channels).map(|chunk| {
                    chunk.iter().map(|s| f32::from(*s) / 32768.0).sum::<f32>() / chunk.len() as f32
                }));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if rate == 0 {
        return Err(Error::Audio("no MP3 frames decoded".to_string()));
    }

    Ok((samples, rate))
}

/// Feedback that speaks messages aloud
///
/// Synthesis and playback run in the background so `speak` never blocks.
/// Messages are serialized so replies do not overlap.
pub struct SpokenFeedback {
    handle: Handle,
    tts: TextToSpeech,
    playback: AudioPlayback,
    speaking: Arc<Mutex<()>>,
}

impl SpokenFeedback {
    #[must_use]
    pub fn new(handle: Handle, tts: TextToSpeech) -> Self {
        Self {
            handle,
            tts,
            playback: AudioPlayback,
            speaking: Arc::new(Mutex::new(())),
        }
    }
}

impl Feedback for SpokenFeedback {
    fn speak(&self, text: &str) {
        tracing::info!(text, "speaking");

        let tts = self.tts.clone();
        let playback = self.playback;
        let speaking = Arc::clone(&self.speaking);
        let text = text.to_string();

        self.handle.spawn(async move {
            let audio = match tts.synthesize(&text).await {
                Ok(audio) => audio,
                Err(e) => {
                    tracing::warn!(error = %e, "speech synthesis failed");
                    return;
                }
            };

            let played = tokio::task::spawn_blocking(move || {
                let _guard = speaking.lock();
                playback.play_mp3(&audio)
            })
            .await;

            match played {
                Ok(Err(e)) => tracing::warn!(error = %e, "playback failed"),
                Err(e) => tracing::warn!(error = %e, "playback task failed"),
                Ok(Ok(())) => {}
            }
        });
    }

    fn show(&self, text: &str) {
        tracing::info!(text, "status");
    }
}
