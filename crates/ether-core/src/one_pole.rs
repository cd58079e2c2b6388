//! One-pole filter for gentle tone shaping and DC/rumble removal.
//!
//! A single-pole IIR low-pass with the difference equation:
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n])
//! ```
//!
//! where `coeff = exp(-2π * freq / sample_rate)`. The high-pass output is
//! the complement `x[n] - y[n]`. 6 dB/octave, zero latency, one multiply
//! per sample.
//!
//! # Usage
//!
//! ```rust
//! use ether_core::{OnePole, OnePoleMode};
//!
//! let mut hp = OnePole::new(48000.0, 20.0);
//! hp.set_mode(OnePoleMode::Highpass);
//! let filtered = hp.process(1.0);
//! assert!(filtered <= 1.0);
//! ```

use crate::math::flush_denormal;
use libm::expf;

/// Which output of the one-pole section is returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnePoleMode {
    /// 6 dB/oct low-pass.
    #[default]
    Lowpass,
    /// 6 dB/oct high-pass (input minus low-pass).
    Highpass,
}

/// One-pole (6 dB/oct) filter.
///
/// # Invariants
///
/// - `coeff` is always in [0, 1) for stable operation
/// - `state` is flushed to zero below 1e-20
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    sample_rate: f32,
    freq: f32,
    mode: OnePoleMode,
}

impl OnePole {
    /// Create a new one-pole low-pass filter.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            sample_rate,
            freq: freq_hz,
            mode: OnePoleMode::Lowpass,
        };
        filter.recalculate_coeff();
        filter
    }

    /// Select the low-pass or high-pass output.
    pub fn set_mode(&mut self, mode: OnePoleMode) {
        self.mode = mode;
    }

    /// Set the cutoff frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        if (freq_hz - self.freq).abs() > f32::EPSILON {
            self.freq = freq_hz;
            self.recalculate_coeff();
        }
    }

    /// Current cutoff frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        if !self.state.is_finite() {
            self.state = 0.0;
        }
        match self.mode {
            OnePoleMode::Lowpass => self.state,
            OnePoleMode::Highpass => input - self.state,
        }
    }

    /// Reset filter state to zero.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    /// Update sample rate and recalculate the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    fn recalculate_coeff(&mut self) {
        let freq = self.freq.clamp(0.0, self.sample_rate * 0.5);
        self.coeff = expf(-core::f32::consts::TAU * freq / self.sample_rate);
    }
}
