//! Mathematical utility functions for DSP.
//!
//! Allocation-free helpers shared by every synthesis engine and the
//! post-processing chain.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//!
//! # Time Constants
//!
//! - [`exp_decay_multiplier`] - Per-sample multiplier for a millisecond time constant
//! - [`ms_to_samples`] - Time conversion
//!
//! # Pitch
//!
//! - [`midi_to_freq`] - Fractional MIDI note to Hz
//! - [`semitones_to_ratio`] - Interval to frequency ratio
//!
//! # Shaping and Safety
//!
//! - [`soft_clip`] - tanh saturation
//! - [`equal_power_pan`] - Constant-power stereo gains
//! - [`flush_denormal`] / [`clamp_finite`] - Keep recursive state well-behaved

use libm::{cosf, expf, logf, powf, sinf, tanhf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use ether_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Inputs below 1e-10 are treated as 1e-10 (-200 dB).
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Soft clip using hyperbolic tangent.
///
/// Output is always in (-1, 1).
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Linear interpolation between `a` (t = 0) and `b` (t = 1).
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert milliseconds to samples.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Per-sample multiplier for an exponential decay with time constant `ms`.
///
/// ```text
/// multiplier = exp(-1000 / (ms * sample_rate))
/// ```
///
/// Applying the multiplier once per sample for `N` samples scales a level by
/// `exp(-N * 1000 / (ms * sample_rate))`. Times below 0.1 ms are clamped.
///
/// # Example
/// ```rust
/// use ether_core::exp_decay_multiplier;
///
/// let m = exp_decay_multiplier(100.0, 48000.0);
/// let mut level = 1.0f32;
/// for _ in 0..4800 {
///     level *= m;
/// }
/// // 100 ms at 48 kHz is exactly one time constant
/// assert!((level - (-1.0f32).exp()).abs() < 1e-3);
/// ```
#[inline]
pub fn exp_decay_multiplier(ms: f32, sample_rate: f32) -> f32 {
    expf(-1000.0 / (ms.max(0.1) * sample_rate))
}

/// Convert a (fractional) MIDI note number to frequency in Hz.
///
/// A4 (note 69) = 440 Hz.
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * powf(2.0, (note - 69.0) / 12.0)
}

/// Convert an interval in semitones to a frequency ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    powf(2.0, semitones / 12.0)
}

/// Equal-power pan gains for a position in [-1, 1] (-1 = hard left).
///
/// Returns `(left_gain, right_gain)` with `l² + r² = 1`.
#[inline]
pub fn equal_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * core::f32::consts::FRAC_PI_4;
    (cosf(angle), sinf(angle))
}

/// Flush subnormal-range floats to zero.
///
/// Values below 1e-20 are replaced with zero, ahead of the IEEE 754
/// subnormal range. Use in feedback paths that decay toward zero.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Replace NaN and infinities with zero.
#[inline]
pub fn clamp_finite(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}
