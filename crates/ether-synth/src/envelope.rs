//! Voice envelopes.
//!
//! [`AdsrEnvelope`] shapes sustained voices with exponential segments.
//! [`DecayEnvelope`] is the one-shot exponential used by percussion.

use ether_core::exp_decay_multiplier;
use libm::expf;

/// Level below which a decaying segment counts as silent.
const SILENCE_THRESHOLD: f32 = 1e-4;

/// Attack aims past 1.0 so the exponential reaches full level in finite time.
const ATTACK_OVERSHOOT: f32 = 1.2;

/// ADSR stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Silent; output is zero.
    #[default]
    Idle,
    /// Rising toward full level.
    Attack,
    /// Falling toward the sustain level.
    Decay,
    /// Holding while the gate stays open.
    Sustain,
    /// Falling to silence after gate-off.
    Release,
}

/// Attack-decay-sustain-release envelope with exponential segments.
///
/// Retriggering from a non-zero level keeps the current level so repeated
/// notes on the same voice do not click.
///
/// ```rust
/// use ether_synth::{AdsrEnvelope, EnvelopeStage};
///
/// let mut env = AdsrEnvelope::new(48000.0);
/// env.set_attack_ms(2.0);
/// env.gate_on();
/// for _ in 0..480 {
///     env.advance();
/// }
/// assert_ne!(env.stage(), EnvelopeStage::Attack);
/// env.gate_off();
/// assert_eq!(env.stage(), EnvelopeStage::Release);
/// ```
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    stage: EnvelopeStage,
    level: f32,
    sample_rate: f32,
    attack_ms: f32,
    decay_ms: f32,
    release_ms: f32,
    sustain: f32,
    attack_coeff: f32,
    decay_coeff: f32,
    release_coeff: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl AdsrEnvelope {
    /// New idle envelope: 5 ms attack, 200 ms decay, 0.7 sustain, 300 ms release.
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            stage: EnvelopeStage::Idle,
            level: 0.0,
            sample_rate,
            attack_ms: 5.0,
            decay_ms: 200.0,
            release_ms: 300.0,
            sustain: 0.7,
            attack_coeff: 0.0,
            decay_coeff: 0.0,
            release_coeff: 0.0,
        };
        env.recalculate();
        env
    }

    /// Attack time in milliseconds (minimum 0.1).
    pub fn set_attack_ms(&mut self, ms: f32) {
        if ms.is_finite() {
            self.attack_ms = ms.max(0.1);
            self.attack_coeff = self.coeff(self.attack_ms);
        }
    }

    /// Decay time in milliseconds (minimum 0.1).
    pub fn set_decay_ms(&mut self, ms: f32) {
        if ms.is_finite() {
            self.decay_ms = ms.max(0.1);
            self.decay_coeff = self.coeff(self.decay_ms);
        }
    }

    /// Sustain level, clamped to [0, 1].
    pub fn set_sustain(&mut self, level: f32) {
        if level.is_finite() {
            self.sustain = level.clamp(0.0, 1.0);
        }
    }

    /// Release time in milliseconds (minimum 0.1).
    pub fn set_release_ms(&mut self, ms: f32) {
        if ms.is_finite() {
            self.release_ms = ms.max(0.1);
            self.release_coeff = self.coeff(self.release_ms);
        }
    }

    /// Sustain level.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Change the sample rate and recompute segment coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Open the gate.
    pub fn gate_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
    }

    /// Close the gate; an idle envelope stays idle.
    pub fn gate_off(&mut self) {
        if self.stage != EnvelopeStage::Idle {
            self.stage = EnvelopeStage::Release;
        }
    }

    /// Jump to idle at zero level.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
    }

    /// Current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current level without advancing.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Whether the envelope is anywhere between attack and the end of release.
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Whether the gate has been closed and the tail is still sounding.
    pub fn is_releasing(&self) -> bool {
        self.stage == EnvelopeStage::Release
    }

    /// Advance one sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => self.level = 0.0,
            EnvelopeStage::Attack => {
                self.level = ATTACK_OVERSHOOT + (self.level - ATTACK_OVERSHOOT) * self.attack_coeff;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.level = self.sustain + (self.level - self.sustain) * self.decay_coeff;
                if (self.level - self.sustain).abs() < SILENCE_THRESHOLD {
                    self.level = self.sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                self.level = self.sustain;
                if self.sustain <= 0.0 {
                    self.stage = EnvelopeStage::Idle;
                }
            }
            EnvelopeStage::Release => {
                self.level *= self.release_coeff;
                if self.level < SILENCE_THRESHOLD {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
        self.level
    }

    fn coeff(&self, ms: f32) -> f32 {
        let samples = ms * self.sample_rate / 1000.0;
        expf(-1.0 / samples.max(1.0))
    }

    fn recalculate(&mut self) {
        self.attack_coeff = self.coeff(self.attack_ms);
        self.decay_coeff = self.coeff(self.decay_ms);
        self.release_coeff = self.coeff(self.release_ms);
    }
}

/// One-shot exponential decay from a trigger level to silence.
#[derive(Debug, Clone)]
pub struct DecayEnvelope {
    level: f32,
    multiplier: f32,
}

impl DecayEnvelope {
    /// Silent envelope.
    pub fn new() -> Self {
        Self {
            level: 0.0,
            multiplier: 0.0,
        }
    }

    /// Start at `level` and fall by `1/e` every `decay_ms`.
    pub fn trigger(&mut self, level: f32, decay_ms: f32, sample_rate: f32) {
        self.level = level;
        self.multiplier = exp_decay_multiplier(decay_ms, sample_rate);
    }

    /// Advance one sample and return the pre-advance level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let out = self.level;
        self.level *= self.multiplier;
        out
    }

    /// Current level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Silence immediately.
    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

impl Default for DecayEnvelope {
    fn default() -> Self {
        Self::new()
    }
}
