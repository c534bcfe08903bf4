//! Frequency-domain energy metering for silence detection
//!
//! Mirrors a browser analyser node: a 256-sample Blackman-windowed transform,
//! temporally smoothed magnitudes, and decibels mapped onto bytes.

use std::f32::consts::PI;

/// Samples per analysis frame
pub const FFT_SIZE: usize = 256;

/// Frequency bins produced per frame
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// Number of bars in the level display
pub const BAR_COUNT: usize = 10;

const SMOOTHING: f32 = 0.8;
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Rolling spectrum analyser over the most recent [`FFT_SIZE`] samples
pub struct SpectrumAnalyser {
    frame: Vec<f32>,
    window: Vec<f32>,
    cos: Vec<f32>,
    sin: Vec<f32>,
    smoothed: Vec<f32>,
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyser {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new() -> Self {
        let n = FFT_SIZE as f32;

        let window = (0..FFT_SIZE)
            .map(|i| {
                let x = i as f32 / n;
                // Blackman, alpha = 0.16
                0.08f32.mul_add((4.0 * PI * x).cos(), 0.5f32.mul_add(-(2.0 * PI * x).cos(), 0.42))
            })
            .collect();

        let (cos, sin) = (0..FFT_SIZE)
            .map(|i| {
                let angle = 2.0 * PI * i as f32 / n;
                (angle.cos(), angle.sin())
            })
            .unzip();

        Self {
            frame: vec![0.0; FFT_SIZE],
            window,
            cos,
            sin,
            smoothed: vec![0.0; BIN_COUNT],
        }
    }

    /// Append captured samples, keeping only the latest frame
    pub fn push(&mut self, samples: &[f32]) {
        if samples.len() >= FFT_SIZE {
            self.frame.copy_from_slice(&samples[samples.len() - FFT_SIZE..]);
            return;
        }

        self.frame.drain(..samples.len());
        self.frame.extend_from_slice(samples);
    }

    /// Byte spectrum of the current frame, updating the smoothed magnitudes
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn byte_frequency_data(&mut self) -> [u8; BIN_COUNT] {
        let mut bytes = [0u8; BIN_COUNT];
        let scale = 1.0 / FFT_SIZE as f32;

        for (k, byte) in bytes.iter_mut().enumerate() {
            let (mut re, mut im) = (0.0f32, 0.0f32);
            for (n, (sample, weight)) in self.frame.iter().zip(&self.window).enumerate() {
                let x = sample * weight;
                let idx = (k * n) % FFT_SIZE;
                re = x.mul_add(self.cos[idx], re);
                im = x.mul_add(-self.sin[idx], im);
            }

            let magnitude = re.hypot(im) * scale;
            let smoothed = SMOOTHING.mul_add(self.smoothed[k], (1.0 - SMOOTHING) * magnitude);
            self.smoothed[k] = smoothed;

            let db = 20.0 * smoothed.log10();
            let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
            // log10(0) is -inf which clamps to 0
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }

        bytes
    }

    /// Mean of the byte spectrum divided by 128, capped at 1
    pub fn normalized_level(&mut self) -> f32 {
        let bytes = self.byte_frequency_data();
        let sum: u32 = bytes.iter().map(|b| u32::from(*b)).sum();

        #[allow(clippy::cast_precision_loss)]
        let average = sum as f32 / BIN_COUNT as f32;

        (average / 128.0).min(1.0)
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.frame.fill(0.0);
        self.smoothed.fill(0.0);
    }
}

/// Level display bars: bar `i` shows the level once it reaches `(i + 1) / 10`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn level_bars(level: f32) -> [f32; BAR_COUNT] {
    let mut bars = [0.0; BAR_COUNT];
    for (i, bar) in bars.iter_mut().enumerate() {
        if level >= (i + 1) as f32 / BAR_COUNT as f32 {
            *bar = level;
        }
    }
    bars
}
