//! Four-operator FM engine.
//!
//! Operators are numbered 0..=3; an operator may only be modulated by
//! higher-numbered operators, so evaluating 3, 2, 1, 0 in order always sees
//! this sample's modulator output. Operator 3 carries self-feedback.
//!
//! - Harmonics: modulator frequency ratio, 0.5x to 8.5x
//! - Timbre: modulation index, 0 to 10 radians
//! - Morph: operator 3 feedback, 0 to 1
//! - FilterType: routing algorithm (eight steps across the range)

use core::f32::consts::{PI, TAU};

use ether_core::{AudioFrame, SmoothedParam, midi_to_freq};
use libm::sinf;

use super::{ADSR_DEFAULTS, apply_adsr, is_adsr, poly_gain};
use crate::engine::{SynthEngine, clamp_unit, valid_note};
use crate::engine_type::EngineType;
use crate::envelope::AdsrEnvelope;
use crate::params::{ParameterBank, ParameterId};
use crate::voice::{PolyVoice, VoicePool};

const OPERATORS: usize = 4;
const MAX_INDEX: f32 = 10.0;

/// Operator routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FmAlgorithm {
    /// 3 → 2 → 1 → 0.
    #[default]
    Stack,
    /// (3 + 2) → 1 → 0.
    Branch,
    /// 3 → 2 → 0 and 1 → 0.
    Fork,
    /// 3 → 2 and 1 → 0; carriers 0 and 2.
    TwoPairs,
    /// 3 → each of 0, 1, 2.
    OneToThree,
    /// 3 → 2; carriers 0, 1, 2.
    StackAndTwo,
    /// (3 + 2 + 1) → 0.
    ThreeToOne,
    /// All four operators are carriers.
    Additive,
}

impl FmAlgorithm {
    /// All algorithms in parameter order.
    pub const ALL: [FmAlgorithm; 8] = [
        FmAlgorithm::Stack,
        FmAlgorithm::Branch,
        FmAlgorithm::Fork,
        FmAlgorithm::TwoPairs,
        FmAlgorithm::OneToThree,
        FmAlgorithm::StackAndTwo,
        FmAlgorithm::ThreeToOne,
        FmAlgorithm::Additive,
    ];

    /// Algorithm selected by a normalized parameter value.
    pub fn from_normalized(value: f32) -> Self {
        let i = (clamp_unit(value) * Self::ALL.len() as f32) as usize;
        Self::ALL[i.min(Self::ALL.len() - 1)]
    }

    /// Normalized value at the centre of this algorithm's step.
    pub fn to_normalized(self) -> f32 {
        (self as usize as f32 + 0.5) / Self::ALL.len() as f32
    }

    /// Per-operator modulator bitmasks and the carrier bitmask.
    pub const fn routing(self) -> ([u8; OPERATORS], u8) {
        match self {
            FmAlgorithm::Stack => ([0b0010, 0b0100, 0b1000, 0], 0b0001),
            FmAlgorithm::Branch => ([0b0010, 0b1100, 0, 0], 0b0001),
            FmAlgorithm::Fork => ([0b0110, 0, 0b1000, 0], 0b0001),
            FmAlgorithm::TwoPairs => ([0b0010, 0, 0b1000, 0], 0b0101),
            FmAlgorithm::OneToThree => ([0b1000, 0b1000, 0b1000, 0], 0b0111),
            FmAlgorithm::StackAndTwo => ([0, 0, 0b1000, 0], 0b0111),
            FmAlgorithm::ThreeToOne => ([0b1110, 0, 0, 0], 0b0001),
            FmAlgorithm::Additive => ([0, 0, 0, 0], 0b1111),
        }
    }

    /// Whether operator `op` is summed to the output.
    pub fn is_carrier(self, op: usize) -> bool {
        self.routing().1 & (1 << op) != 0
    }
}

#[derive(Debug, Clone)]
struct Operator {
    phase: f32,
    ratio: f32,
    env: AdsrEnvelope,
    out: f32,
    prev_out: f32,
}

impl Operator {
    fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            ratio: 1.0,
            env: AdsrEnvelope::new(sample_rate),
            out: 0.0,
            prev_out: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct FmVoice {
    ops: [Operator; OPERATORS],
    base_inc: f32,
    note: u8,
    velocity: f32,
    stamp: u64,
}

impl FmVoice {
    fn new(sample_rate: f32) -> Self {
        Self {
            ops: core::array::from_fn(|_| Operator::new(sample_rate)),
            base_inc: 0.0,
            note: 0,
            velocity: 0.0,
            stamp: 0,
        }
    }

    #[inline]
    fn render(&mut self, mods: &[u8; OPERATORS], carriers: u8, index: f32, feedback: f32) -> f32 {
        let mut out = 0.0;
        for op in (0..OPERATORS).rev() {
            let mut pm = 0.0;
            for src in (op + 1)..OPERATORS {
                if mods[op] & (1 << src) != 0 {
                    pm += self.ops[src].out * index;
                }
            }
            let o = &mut self.ops[op];
            if op == OPERATORS - 1 {
                pm += feedback * PI * 0.5 * (o.out + o.prev_out);
            }
            let level = o.env.advance();
            let sample = sinf(TAU * o.phase + pm) * level;
            o.prev_out = o.out;
            o.out = sample;
            o.phase += self.base_inc * o.ratio;
            o.phase -= libm::floorf(o.phase);
            if carriers & (1 << op) != 0 {
                out += sample;
            }
        }
        out * self.velocity
    }
}

impl PolyVoice for FmVoice {
    fn is_active(&self) -> bool {
        self.ops.iter().any(|o| o.env.is_active())
    }

    fn note(&self) -> u8 {
        self.note
    }

    fn stamp(&self) -> u64 {
        self.stamp
    }

    fn kill(&mut self) {
        for op in &mut self.ops {
            op.env.reset();
            op.out = 0.0;
            op.prev_out = 0.0;
        }
    }
}

const DEFAULTS: [(ParameterId, f32); 9] = [
    (ParameterId::Harmonics, 0.0625),
    (ParameterId::Timbre, 0.3),
    (ParameterId::Morph, 0.0),
    (ParameterId::FilterType, 0.0625),
    (ParameterId::Volume, 0.8),
    ADSR_DEFAULTS[0],
    ADSR_DEFAULTS[1],
    ADSR_DEFAULTS[2],
    ADSR_DEFAULTS[3],
];

/// Polyphonic four-operator FM synthesizer.
pub struct FmEngine {
    pool: VoicePool<FmVoice>,
    params: ParameterBank,
    algorithm: FmAlgorithm,
    sample_rate: f32,
    gain: SmoothedParam,
}

impl FmEngine {
    /// New engine with every voice idle.
    pub fn new(sample_rate: f32) -> Self {
        let params = ParameterBank::new(&DEFAULTS);
        let mut engine = Self {
            pool: VoicePool::new(|_| FmVoice::new(sample_rate)),
            algorithm: FmAlgorithm::from_normalized(params.get(ParameterId::FilterType)),
            params,
            sample_rate,
            gain: SmoothedParam::with_config(poly_gain(1), sample_rate, 10.0),
        };
        engine.refresh_voices();
        engine
    }

    /// Current routing.
    pub fn algorithm(&self) -> FmAlgorithm {
        self.algorithm
    }

    /// Select a routing directly.
    pub fn set_algorithm(&mut self, algorithm: FmAlgorithm) {
        self.set_parameter(ParameterId::FilterType, algorithm.to_normalized());
    }

    /// Frequency ratio applied to modulating operators.
    pub fn modulator_ratio(&self) -> f32 {
        0.5 + 8.0 * self.params.get(ParameterId::Harmonics)
    }

    fn refresh_voices(&mut self) {
        let mod_ratio = self.modulator_ratio();
        let algorithm = self.algorithm;
        let sustain = self.params.get(ParameterId::Sustain);
        for voice in self.pool.all_voices_mut() {
            for (i, op) in voice.ops.iter_mut().enumerate() {
                apply_adsr(&mut op.env, &self.params);
                if algorithm.is_carrier(i) {
                    op.ratio = if algorithm == FmAlgorithm::Additive {
                        (i + 1) as f32
                    } else {
                        1.0
                    };
                } else {
                    op.ratio = mod_ratio;
                    let decay = crate::params::decay_ms(self.params.get(ParameterId::Decay));
                    op.env.set_decay_ms(decay * 0.6);
                    op.env.set_sustain(sustain * 0.7);
                }
            }
        }
    }
}

impl SynthEngine for FmEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::Classic4OpFm
    }

    fn description(&self) -> &'static str {
        "Four operators with eight routings and feedback"
    }

    fn note_on(&mut self, note: u8, velocity: f32, _aftertouch: f32) {
        if !valid_note(note) {
            return;
        }
        let playing = self.pool.playing(note).next();
        let index = match playing {
            Some(i) => i,
            None => self.pool.claim().index(),
        };
        let stamp = self.pool.next_stamp();
        let inc = midi_to_freq(f32::from(note)) / self.sample_rate;
        let voice = &mut self.pool.voices_mut()[index];
        let fresh = !voice.is_active();
        voice.note = note;
        voice.velocity = clamp_unit(velocity);
        voice.stamp = stamp;
        voice.base_inc = inc;
        for op in &mut voice.ops {
            if fresh {
                op.phase = 0.0;
                op.out = 0.0;
                op.prev_out = 0.0;
            }
            op.env.gate_on();
        }
    }

    fn note_off(&mut self, note: u8) {
        for voice in self.pool.voices_mut() {
            if voice.is_active() && voice.note == note {
                for op in &mut voice.ops {
                    op.env.gate_off();
                }
            }
        }
    }

    fn all_notes_off(&mut self) {
        self.pool.kill_all();
    }

    fn set_parameter(&mut self, id: ParameterId, value: f32) {
        if !self.params.set(id, value) {
            return;
        }
        match id {
            ParameterId::FilterType => {
                self.algorithm = FmAlgorithm::from_normalized(self.params.get(id));
                self.refresh_voices();
            }
            ParameterId::Harmonics => self.refresh_voices(),
            id if is_adsr(id) => self.refresh_voices(),
            _ => {}
        }
    }

    fn get_parameter(&self, id: ParameterId) -> f32 {
        self.params.get(id)
    }

    fn has_parameter(&self, id: ParameterId) -> bool {
        self.params.supports(id)
    }

    fn process(&mut self, output: &mut [AudioFrame]) {
        let (mods, carriers) = self.algorithm.routing();
        let carrier_norm = 1.0 / carriers.count_ones().max(1) as f32;
        let index = self.params.get(ParameterId::Timbre) * MAX_INDEX;
        let feedback = self.params.get(ParameterId::Morph);
        let volume = self.params.get(ParameterId::Volume);
        self.gain.set_target(poly_gain(self.pool.active_count()) * carrier_norm);
        for frame in output.iter_mut() {
            let mut sum = 0.0;
            for voice in self.pool.voices_mut() {
                if voice.is_active() {
                    sum += voice.render(&mods, carriers, index, feedback);
                }
            }
            *frame = AudioFrame::mono(sum * self.gain.advance() * volume);
        }
    }

    fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    fn max_voice_count(&self) -> usize {
        self.pool.limit()
    }

    fn set_voice_count(&mut self, count: usize) {
        self.pool.set_limit(count);
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return;
        }
        self.sample_rate = sample_rate;
        self.gain.set_sample_rate(sample_rate);
        for voice in self.pool.all_voices_mut() {
            *voice = FmVoice::new(sample_rate);
        }
        self.refresh_voices();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_only_from_higher_operators() {
        for algo in FmAlgorithm::ALL {
            let (mods, carriers) = algo.routing();
            assert!(carriers != 0, "{algo:?} has no carrier");
            for (op, mask) in mods.iter().enumerate() {
                assert_eq!(mask & ((1u8 << (op + 1)) - 1), 0, "{algo:?} op {op}");
            }
        }
    }

    #[test]
    fn test_algorithm_normalized_roundtrip() {
        for algo in FmAlgorithm::ALL {
            assert_eq!(FmAlgorithm::from_normalized(algo.to_normalized()), algo);
        }
        assert_eq!(FmAlgorithm::from_normalized(1.0), FmAlgorithm::Additive);
    }

    #[test]
    fn test_harmonics_maps_ratio() {
        let mut engine = FmEngine::new(48000.0);
        engine.set_parameter(ParameterId::Harmonics, 0.0);
        assert!((engine.modulator_ratio() - 0.5).abs() < 1e-6);
        engine.set_parameter(ParameterId::Harmonics, 1.0);
        assert!((engine.modulator_ratio() - 8.5).abs() < 1e-6);
    }

    #[test]
    fn test_every_algorithm_renders() {
        let mut engine = FmEngine::new(48000.0);
        engine.set_parameter(ParameterId::Timbre, 0.8);
        engine.set_parameter(ParameterId::Morph, 1.0);
        for algo in FmAlgorithm::ALL {
            engine.set_algorithm(algo);
            assert_eq!(engine.algorithm(), algo);
            engine.note_on(57, 1.0, 0.0);
            let mut buf = [AudioFrame::SILENCE; 256];
            engine.process(&mut buf);
            assert!(buf.iter().all(AudioFrame::is_finite));
            assert!(buf.iter().any(|f| f.peak() > 1e-3), "{algo:?} silent");
            engine.all_notes_off();
        }
    }

    #[test]
    fn test_note_off_releases() {
        let mut engine = FmEngine::new(48000.0);
        engine.note_on(60, 0.9, 0.0);
        let mut buf = [AudioFrame::SILENCE; 128];
        engine.process(&mut buf);
        engine.note_off(60);
        for _ in 0..500 {
            engine.process(&mut buf);
        }
        assert_eq!(engine.active_voice_count(), 0);
    }
}
