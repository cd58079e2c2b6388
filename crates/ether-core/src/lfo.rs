//! Low Frequency Oscillator for parameter modulation.
//!
//! The audio engine advances each slot's LFOs once per block rather than once
//! per sample: [`Lfo::advance_block`] moves the phase by `frames × increment`
//! and returns the value at the new phase. [`Lfo::next`] is the per-sample
//! form of the same thing.
//!
//! # Sync modes
//!
//! | Mode        | Behaviour                                                     |
//! |-------------|---------------------------------------------------------------|
//! | `Free`      | Runs continuously at its own rate                             |
//! | `Tempo`     | Rate snapped to the nearest power-of-two division of the beat |
//! | `Key`       | Free-running, phase reset on every note-on                    |
//! | `OneShot`   | Reset on note-on, runs one cycle, then holds its last value   |
//! | `Envelope`  | Like `OneShot` but unipolar and holds at zero when finished   |

use core::f32::consts::PI;
use libm::{log2f, powf, roundf, sinf};

use crate::noise::NoiseGenerator;

/// LFO waveform type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Sine.
    #[default]
    Sine,
    /// Symmetric triangle.
    Triangle,
    /// Rising ramp.
    SawUp,
    /// Falling ramp.
    SawDown,
    /// 50% square.
    Square,
    /// Random value held for one cycle.
    SampleAndHold,
    /// New random value on every update.
    Noise,
}

impl LfoWaveform {
    /// All waveforms in index order.
    pub const ALL: [LfoWaveform; 7] = [
        LfoWaveform::Sine,
        LfoWaveform::Triangle,
        LfoWaveform::SawUp,
        LfoWaveform::SawDown,
        LfoWaveform::Square,
        LfoWaveform::SampleAndHold,
        LfoWaveform::Noise,
    ];

    /// Waveform for an index; out-of-range indices clamp to the last entry.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }
}

/// How an LFO relates to tempo and note events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoSync {
    /// Free running.
    #[default]
    Free,
    /// Rate quantized to the transport tempo.
    Tempo,
    /// Phase reset on note-on.
    Key,
    /// Single cycle after note-on.
    OneShot,
    /// Single unipolar cycle after note-on.
    Envelope,
}

impl LfoSync {
    /// All sync modes in index order.
    pub const ALL: [LfoSync; 5] = [
        LfoSync::Free,
        LfoSync::Tempo,
        LfoSync::Key,
        LfoSync::OneShot,
        LfoSync::Envelope,
    ];

    /// Sync mode for an index; out-of-range indices clamp to the last entry.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Whether a note-on restarts the cycle.
    pub fn retriggers(self) -> bool {
        matches!(self, LfoSync::Key | LfoSync::OneShot | LfoSync::Envelope)
    }
}

/// Low Frequency Oscillator for generating modulation signals.
///
/// Output is bipolar in [-1, 1] except in [`LfoSync::Envelope`] mode, which
/// is unipolar in [0, 1]. The depth setting scales the output.
///
/// # Example
///
/// ```rust
/// use ether_core::{Lfo, LfoWaveform};
///
/// let mut lfo = Lfo::new(48000.0, 2.0);
/// lfo.set_waveform(LfoWaveform::Triangle);
///
/// // One 128-frame block
/// let value = lfo.advance_block(128);
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    rate_hz: f32,
    sample_rate: f32,
    bpm: f32,
    waveform: LfoWaveform,
    sync: LfoSync,
    depth: f32,
    held: f32,
    value: f32,
    finished: bool,
    rng: NoiseGenerator,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Minimum rate in Hz.
    pub const MIN_RATE: f32 = 0.01;
    /// Maximum rate in Hz.
    pub const MAX_RATE: f32 = 50.0;

    /// Create new LFO with given sample rate and frequency.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut lfo = Self {
            phase: 0.0,
            rate_hz: 1.0,
            sample_rate,
            bpm: 120.0,
            waveform: LfoWaveform::Sine,
            sync: LfoSync::Free,
            depth: 1.0,
            held: 0.0,
            value: 0.0,
            finished: false,
            rng: NoiseGenerator::new(0x2545_F491),
        };
        lfo.set_frequency(freq_hz);
        lfo
    }

    /// Set rate in Hz, clamped to `MIN_RATE..=MAX_RATE`.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        if freq_hz.is_finite() {
            self.rate_hz = freq_hz.clamp(Self::MIN_RATE, Self::MAX_RATE);
        }
    }

    /// Rate as set by the user, in Hz.
    pub fn frequency(&self) -> f32 {
        self.rate_hz
    }

    /// Rate actually used for phase accumulation, after tempo quantization.
    pub fn effective_frequency(&self) -> f32 {
        match self.sync {
            LfoSync::Tempo => {
                let beat_hz = self.bpm / 60.0;
                let divisions = roundf(log2f(self.rate_hz / beat_hz)).clamp(-6.0, 6.0);
                beat_hz * powf(2.0, divisions)
            }
            _ => self.rate_hz,
        }
    }

    /// Set the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Set the sync mode.
    pub fn set_sync(&mut self, sync: LfoSync) {
        self.sync = sync;
        self.finished = false;
    }

    /// Current sync mode.
    pub fn sync(&self) -> LfoSync {
        self.sync
    }

    /// Set output depth, clamped to [0, 1].
    pub fn set_depth(&mut self, depth: f32) {
        if depth.is_finite() {
            self.depth = depth.clamp(0.0, 1.0);
        }
    }

    /// Output depth.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Tempo used by [`LfoSync::Tempo`].
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm = bpm;
        }
    }

    /// Note-on hook: restarts the cycle for retriggering sync modes.
    pub fn trigger(&mut self) {
        if self.sync.retriggers() {
            self.reset();
        }
    }

    /// Reset phase to 0 and pick a fresh sample-and-hold value.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.finished = false;
        self.held = self.rng.next_bipolar();
    }

    /// Set phase (0.0..1.0).
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.clamp(0.0, 1.0);
    }

    /// Current phase (0.0..1.0).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Whether a one-shot cycle has completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The most recently computed output, depth applied.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advance by `frames` samples and return the output at the new phase.
    pub fn advance_block(&mut self, frames: usize) -> f32 {
        self.step(self.effective_frequency() / self.sample_rate * frames as f32);
        self.value
    }

    /// Advance by one sample and return the output.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.advance_block(1)
    }

    /// Update sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn step(&mut self, increment: f32) {
        let one_shot = matches!(self.sync, LfoSync::OneShot | LfoSync::Envelope);
        if self.finished {
            self.value = match self.sync {
                LfoSync::Envelope => 0.0,
                _ => self.value,
            };
            return;
        }

        self.phase += increment;
        if self.phase >= 1.0 {
            if one_shot {
                self.phase = 1.0;
                self.finished = true;
            } else {
                self.phase -= libm::floorf(self.phase);
                self.held = self.rng.next_bipolar();
            }
        }

        let raw = self.shape(self.phase);
        self.value = match self.sync {
            LfoSync::Envelope if self.finished => 0.0,
            LfoSync::Envelope => (raw + 1.0) * 0.5 * self.depth,
            _ => raw * self.depth,
        };
    }

    fn shape(&mut self, phase: f32) -> f32 {
        match self.waveform {
            LfoWaveform::Sine => sinf(phase * 2.0 * PI),
            LfoWaveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            LfoWaveform::SawUp => 2.0 * phase - 1.0,
            LfoWaveform::SawDown => 1.0 - 2.0 * phase,
            LfoWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::SampleAndHold => self.held,
            LfoWaveform::Noise => self.rng.next_bipolar(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfo_phase_accumulation() {
        let mut lfo = Lfo::new(48000.0, 1.0);
        for _ in 0..375 {
            lfo.advance_block(128);
        }
        // 48000 samples at 1 Hz is one full cycle
        let phase_error = lfo.phase().min((lfo.phase() - 1.0).abs());
        assert!(phase_error < 0.01, "phase error {}", phase_error);
    }

    #[test]
    fn test_lfo_output_range() {
        let mut lfo = Lfo::new(48000.0, 5.0);
        for waveform in LfoWaveform::ALL {
            lfo.set_waveform(waveform);
            lfo.reset();
            for _ in 0..1000 {
                let value = lfo.next();
                assert!(
                    (-1.0..=1.0).contains(&value),
                    "Waveform {:?} out of range: {}",
                    waveform,
                    value
                );
            }
        }
    }

    #[test]
    fn test_block_advance_matches_per_sample() {
        let mut a = Lfo::new(48000.0, 3.0);
        let mut b = Lfo::new(48000.0, 3.0);
        let block = a.advance_block(128);
        let mut last = 0.0;
        for _ in 0..128 {
            last = b.next();
        }
        assert!((block - last).abs() < 1e-4, "{} vs {}", block, last);
    }

    #[test]
    fn test_depth_scales_output() {
        let mut lfo = Lfo::new(48000.0, 1.0);
        lfo.set_waveform(LfoWaveform::Square);
        lfo.set_depth(0.25);
        let v = lfo.next();
        assert!((v - 0.25).abs() < 1e-6, "got {}", v);
    }

    #[test]
    fn test_rate_clamped() {
        let mut lfo = Lfo::new(48000.0, 1000.0);
        assert_eq!(lfo.frequency(), Lfo::MAX_RATE);
        lfo.set_frequency(0.0);
        assert_eq!(lfo.frequency(), Lfo::MIN_RATE);
        lfo.set_frequency(f32::NAN);
        assert_eq!(lfo.frequency(), Lfo::MIN_RATE);
    }

    #[test]
    fn test_tempo_sync_quantizes() {
        let mut lfo = Lfo::new(48000.0, 2.3);
        lfo.set_bpm(120.0);
        lfo.set_sync(LfoSync::Tempo);
        // 120 BPM is 2 Hz per beat; 2.3 Hz snaps to one cycle per beat
        assert!((lfo.effective_frequency() - 2.0).abs() < 1e-4);
        lfo.set_frequency(7.0);
        assert!((lfo.effective_frequency() - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_key_sync_retriggers() {
        let mut lfo = Lfo::new(48000.0, 1.0);
        lfo.set_sync(LfoSync::Key);
        lfo.advance_block(10_000);
        assert!(lfo.phase() > 0.1);
        lfo.trigger();
        assert_eq!(lfo.phase(), 0.0);

        // Free mode ignores note-on
        lfo.set_sync(LfoSync::Free);
        lfo.advance_block(10_000);
        let before = lfo.phase();
        lfo.trigger();
        assert_eq!(lfo.phase(), before);
    }

    #[test]
    fn test_one_shot_holds() {
        let mut lfo = Lfo::new(48000.0, 10.0);
        lfo.set_waveform(LfoWaveform::SawUp);
        lfo.set_sync(LfoSync::OneShot);
        lfo.trigger();
        for _ in 0..100 {
            lfo.advance_block(128);
        }
        assert!(lfo.is_finished());
        let held = lfo.value();
        assert!((held - 1.0).abs() < 1e-5, "one-shot saw should end high, got {}", held);
        lfo.advance_block(128);
        assert_eq!(lfo.value(), held);
    }

    #[test]
    fn test_envelope_mode_unipolar_and_ends_at_zero() {
        let mut lfo = Lfo::new(48000.0, 5.0);
        lfo.set_sync(LfoSync::Envelope);
        lfo.trigger();
        let mut saw_positive = false;
        for _ in 0..200 {
            let v = lfo.advance_block(64);
            assert!((0.0..=1.0).contains(&v), "envelope out of range: {}", v);
            saw_positive |= v > 0.5;
        }
        assert!(saw_positive);
        assert!(lfo.is_finished());
        assert_eq!(lfo.value(), 0.0);
    }
}
