//! Band-limited audio oscillator.
//!
//! Saw, square and pulse use a 4th-order PolyBLEP correction around each
//! discontinuity; the triangle is a leaky integral of the corrected square.

use core::f32::consts::TAU;
use libm::{floorf, sinf};

/// Oscillator waveforms.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Waveform {
    /// Pure fundamental.
    #[default]
    Sine,
    /// Odd harmonics, soft.
    Triangle,
    /// All harmonics.
    Saw,
    /// 50% pulse.
    Square,
    /// Pulse with duty cycle in (0, 1).
    Pulse(f32),
}

/// PolyBLEP oscillator with a normalized phase accumulator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f32,
    phase_inc: f32,
    frequency: f32,
    sample_rate: f32,
    waveform: Waveform,
    integrator: f32,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Oscillator {
    /// New sine oscillator at 440 Hz.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            frequency: 440.0,
            sample_rate,
            waveform: Waveform::Sine,
            integrator: 0.0,
        }
    }

    /// Frequency in Hz, clamped to `[0, 0.49 * sample_rate]`.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        if !freq_hz.is_finite() {
            return;
        }
        self.frequency = freq_hz.clamp(0.0, self.sample_rate * 0.49);
        self.phase_inc = self.frequency / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Select a waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Change the sample rate, keeping the frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.set_frequency(self.frequency);
    }

    /// Restart the cycle at phase 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.integrator = 0.0;
    }

    /// Current phase in [0, 1).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Produce one sample and advance.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let dt = self.phase_inc.max(1e-6);
        let phase = self.phase;
        let out = match self.waveform {
            Waveform::Sine => sinf(phase * TAU),
            Waveform::Saw => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            Waveform::Square => pulse(phase, 0.5, dt),
            Waveform::Pulse(duty) => pulse(phase, duty.clamp(0.01, 0.99), dt),
            Waveform::Triangle => {
                let square = pulse(phase, 0.5, dt);
                let leak = 1.0 - self.phase_inc.min(0.1);
                self.integrator = leak * self.integrator + square * dt * 4.0;
                self.integrator
            }
        };
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= floorf(self.phase);
        }
        out
    }
}

#[inline]
fn pulse(phase: f32, duty: f32, dt: f32) -> f32 {
    let naive = if phase < duty { 1.0 } else { -1.0 };
    let mut falling = phase - duty;
    if falling < 0.0 {
        falling += 1.0;
    }
    naive + poly_blep(phase, dt) - poly_blep(falling, dt)
}

/// 4th-order PolyBLEP residual over a two-sample window each side of a step.
#[inline]
pub(crate) fn poly_blep(t: f32, dt: f32) -> f32 {
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    let inner = |n: f32| {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    };

    if t < 2.0 * dt {
        inner(t / dt)
    } else if t > 1.0 - 2.0 * dt {
        -inner((1.0 - t) / dt)
    } else {
        0.0
    }
}
