//! State Variable Filter.
//!
//! Topology-Preserving Transform (TPT) SVF after Zavalishin, "The Art of VA
//! Filter Design" (2012). Trapezoidal integration keeps the analog response
//! and stays stable while the cutoff is swept every sample, which is what the
//! synthesis voices do with envelope and key tracking.
//!
//! # Nonlinear Drive
//!
//! Optional tanh saturation of the band-pass integrator state. Drive only
//! touches the state update, so small-signal response is unchanged.

use core::f32::consts::PI;
use libm::{tanf, tanhf};

use crate::math::flush_denormal;

/// State Variable Filter output type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfOutput {
    /// Low-pass output.
    #[default]
    Lowpass,
    /// High-pass output.
    Highpass,
    /// Band-pass output.
    Bandpass,
    /// Notch output.
    Notch,
}

/// State Variable Filter (2-pole, 12 dB/oct).
///
/// ## Parameters
///
/// - `cutoff`: Hz, clamped to 20.0..sr×0.49 (default 1000.0)
/// - `resonance`: Q, clamped to 0.5..20.0 (default 0.707)
/// - `drive`: 0.0..1.0 (default 0.0)
///
/// # Example
///
/// ```rust
/// use ether_core::{StateVariableFilter, SvfOutput};
///
/// let mut svf = StateVariableFilter::new(48000.0);
/// svf.set_cutoff(1000.0);
/// svf.set_resonance(2.0);
/// svf.set_output_type(SvfOutput::Lowpass);
///
/// let output = svf.process(0.5);
/// assert!(output.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    ic1eq: f32,
    ic2eq: f32,

    g: f32,
    k: f32,

    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    output_type: SvfOutput,
    drive: f32,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl StateVariableFilter {
    /// Create a new SVF: 1 kHz, Q 0.707, no drive, low-pass output.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 0.0,
            sample_rate,
            cutoff: 1000.0,
            resonance: 0.707,
            output_type: SvfOutput::Lowpass,
            drive: 0.0,
        };
        svf.update_coefficients();
        svf
    }

    /// Set cutoff frequency in Hz (clamped).
    pub fn set_cutoff(&mut self, freq: f32) {
        let freq = if freq.is_finite() { freq } else { 1000.0 };
        self.cutoff = freq.clamp(20.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Current cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set resonance (Q factor, clamped to 0.5..20.0).
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.5, 20.0);
        self.update_coefficients();
    }

    /// Current resonance (Q factor).
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Set the output type.
    pub fn set_output_type(&mut self, output_type: SvfOutput) {
        self.output_type = output_type;
    }

    /// Set nonlinear drive amount (0.0..1.0).
    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(0.0, 1.0);
    }

    /// Update sample rate and recompute coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.set_cutoff(self.cutoff);
    }

    fn update_coefficients(&mut self) {
        self.g = tanf(PI * self.cutoff / self.sample_rate);
        self.k = 1.0 / self.resonance;
    }

    /// Process one sample and return `(lowpass, highpass, bandpass, notch)`.
    pub fn process_all(&mut self, input: f32) -> (f32, f32, f32, f32) {
        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq + self.g * v1;

        let v1_sat = if self.drive > 0.0 {
            let d = 1.0 + self.drive * 3.0;
            tanhf(v1 * d) / d
        } else {
            v1
        };

        self.ic1eq = flush_denormal(2.0 * v1_sat - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);
        if !(self.ic1eq.is_finite() && self.ic2eq.is_finite()) {
            self.reset();
            return (0.0, 0.0, 0.0, 0.0);
        }

        let lp = v2;
        let bp = v1;
        let hp = input - self.k * v1 - v2;
        (lp, hp, bp, lp + hp)
    }

    /// Process one sample through the selected output.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let (lp, hp, bp, notch) = self.process_all(input);
        match self.output_type {
            SvfOutput::Lowpass => lp,
            SvfOutput::Highpass => hp,
            SvfOutput::Bandpass => bp,
            SvfOutput::Notch => notch,
        }
    }

    /// Clear integrator state.
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svf_lowpass_dc() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(1000.0);

        let mut output = 0.0;
        for _ in 0..1000 {
            output = svf.process(1.0);
        }
        assert!(
            (output - 1.0).abs() < 0.05,
            "DC should pass, got {}",
            output
        );
    }

    #[test]
    fn test_svf_highpass_blocks_dc() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(1000.0);
        svf.set_output_type(SvfOutput::Highpass);

        let mut output = 0.0;
        for _ in 0..1000 {
            output = svf.process(1.0);
        }
        assert!(output.abs() < 0.1, "DC should be blocked, got {}", output);
    }

    #[test]
    fn test_svf_cutoff_clamped() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(1.0e6);
        assert!(svf.cutoff() <= 48000.0 * 0.49);
        svf.set_cutoff(f32::NAN);
        assert_eq!(svf.cutoff(), 1000.0);
        svf.set_cutoff(0.0);
        assert_eq!(svf.cutoff(), 20.0);
    }

    #[test]
    fn test_svf_high_resonance_stays_finite() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(5000.0);
        svf.set_resonance(20.0);
        for i in 0..48000 {
            let input = if (i / 50) % 2 == 0 { 1.0 } else { -1.0 };
            assert!(svf.process(input).is_finite());
        }
    }

    #[test]
    fn test_svf_reset() {
        let mut svf = StateVariableFilter::new(48000.0);
        for _ in 0..100 {
            svf.process(1.0);
        }
        svf.reset();
        assert_eq!(svf.process(0.0), 0.0);
    }
}
