//! Microphone capture via cpal

use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use super::session::{AudioStream, Microphone};
use crate::{Error, Result};

/// Sample rate preferred for speech (and required by the WAV uploads)
pub const SAMPLE_RATE: u32 = 16000;

/// Opens the default input device
#[derive(Debug, Default)]
pub struct CpalMicrophone;

impl Microphone for CpalMicrophone {
    fn acquire(&mut self) -> Result<Box<dyn AudioStream>> {
        Ok(Box::new(AudioCapture::open()?))
    }
}

/// An open capture stream buffering mono samples
///
/// The cpal stream lives on its own thread until [`release`](AudioStream::release)
/// drops the stop channel.
pub struct AudioCapture {
    sample_rate: u32,
    buffer: Arc<Mutex<Vec<f32>>>,
    stop: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl AudioCapture {
    /// Open the default input device and start capturing
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available or the stream fails
    pub fn open() -> Result<Self> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let worker_buffer = Arc::clone(&buffer);
        let worker = std::thread::Builder::new()
            .name("larder-capture".to_string())
            .spawn(move || match open_stream(worker_buffer) {
                Ok((stream, rate)) => {
                    let _ = ready_tx.send(Ok(rate));
                    // Returns once the sender is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                    tracing::debug!("audio capture stopped");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        let sample_rate = ready_rx
            .recv()
            .map_err(|_| Error::Microphone("capture thread exited".to_string()))??;

        tracing::debug!(sample_rate, "audio capture started");

        Ok(Self {
            sample_rate,
            buffer,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }
}

fn open_stream(buffer: Arc<Mutex<Vec<f32>>>) -> Result<(Stream, u32)> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| Error::Microphone("no input device available".to_string()))?;

    let preferred = device
        .supported_input_configs()
        .map_err(|e| Error::Microphone(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        });

    // Fall back to whatever the device runs at natively
    let config: StreamConfig = match preferred {
        Some(supported) => supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config(),
        None => device
            .default_input_config()
            .map_err(|e| Error::Microphone(e.to_string()))?
            .config(),
    };

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = config.sample_rate.0,
        channels = config.channels,
        "audio capture initialized"
    );

    let channels = usize::from(config.channels.max(1));

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    if channels == 1 {
                        buf.extend_from_slice(data);
                    } else {
                        #[allow(clippy::cast_precision_loss)]
                        buf.extend(
                            data.chunks(channels)
                                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                        );
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| Error::Microphone(e.to_string()))?;

    stream.play().map_err(|e| Error::Microphone(e.to_string()))?;

    Ok((stream, config.sample_rate.0))
}

impl AudioStream for AudioCapture {
    fn take_samples(&mut self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn release(&mut self) {
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Resample mono audio with rubato
///
/// Trailing samples that do not fill a whole chunk are zero-padded.
///
/// # Errors
///
/// Returns error if the resampler cannot be built
#[allow(clippy::cast_possible_truncation)]
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let chunk_size = 1024;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1)
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let mut output = Vec::new();

    for chunk in samples.chunks(chunk_size) {
        let mut input: Vec<f64> = chunk.iter().map(|&s| f64::from(s)).collect();
        input.resize(chunk_size, 0.0);

        let result = resampler
            .process(&[input], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend(result[0].iter().map(|&s| s as f32));
    }

    Ok(output)
}

/// Encode mono f32 samples as 16-bit WAV
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let value = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(value)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
