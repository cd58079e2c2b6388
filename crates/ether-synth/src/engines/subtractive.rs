//! Virtual-analog subtractive engine.
//!
//! Two saws (the second detuned) plus a square sub an octave down, through a
//! resonant 2-pole low-pass, shaped by an ADSR.
//!
//! - Harmonics: osc1/osc2 balance
//! - Timbre: cutoff, 200 Hz to 5 kHz exponential
//! - Morph: resonance, Q 0.5 to 5.0
//!
//! `FilterCutoff` and `FilterResonance` write the same filter state as
//! Timbre and Morph; whichever was set last wins.

use ether_core::{AudioFrame, SmoothedParam, StateVariableFilter, SvfOutput, midi_to_freq};

use super::{ADSR_DEFAULTS, apply_adsr, is_adsr, poly_gain};
use crate::engine::{SynthEngine, clamp_unit, valid_note};
use crate::engine_type::EngineType;
use crate::envelope::AdsrEnvelope;
use crate::oscillator::{Oscillator, Waveform};
use crate::params::{ParameterBank, ParameterId, norm_to_exp};
use crate::voice::{PolyVoice, VoicePool};

const MAX_DETUNE_CENTS: f32 = 50.0;

#[derive(Debug, Clone)]
struct VaVoice {
    osc1: Oscillator,
    osc2: Oscillator,
    sub: Oscillator,
    filter: StateVariableFilter,
    env: AdsrEnvelope,
    note: u8,
    velocity: f32,
    pressure: f32,
    stamp: u64,
}

impl VaVoice {
    fn new(sample_rate: f32) -> Self {
        let mut osc1 = Oscillator::new(sample_rate);
        osc1.set_waveform(Waveform::Saw);
        let mut osc2 = Oscillator::new(sample_rate);
        osc2.set_waveform(Waveform::Saw);
        let mut sub = Oscillator::new(sample_rate);
        sub.set_waveform(Waveform::Square);
        let mut filter = StateVariableFilter::new(sample_rate);
        filter.set_output_type(SvfOutput::Lowpass);
        Self {
            osc1,
            osc2,
            sub,
            filter,
            env: AdsrEnvelope::new(sample_rate),
            note: 0,
            velocity: 0.0,
            pressure: 0.0,
            stamp: 0,
        }
    }

    fn tune(&mut self, detune_cents: f32) {
        let freq = midi_to_freq(f32::from(self.note));
        self.osc1.set_frequency(freq);
        self.osc2.set_frequency(freq * libm::powf(2.0, detune_cents / 1200.0));
        self.sub.set_frequency(freq * 0.5);
    }

    #[inline]
    fn render(&mut self, mix: f32, sub_level: f32) -> f32 {
        let osc = self.osc1.advance() * (1.0 - mix) + self.osc2.advance() * mix;
        let raw = osc + self.sub.advance() * sub_level;
        self.filter.process(raw) * self.env.advance() * self.velocity
    }
}

impl PolyVoice for VaVoice {
    fn is_active(&self) -> bool {
        self.env.is_active()
    }

    fn note(&self) -> u8 {
        self.note
    }

    fn stamp(&self) -> u64 {
        self.stamp
    }

    fn kill(&mut self) {
        self.env.reset();
        self.filter.reset();
    }
}

/// Polyphonic two-oscillator subtractive synthesizer.
pub struct SubtractiveEngine {
    pool: VoicePool<VaVoice>,
    params: ParameterBank,
    cutoff_hz: f32,
    resonance_q: f32,
    gain: SmoothedParam,
}

impl SubtractiveEngine {
    /// New engine with every voice idle.
    pub fn new(sample_rate: f32) -> Self {
        let params = ParameterBank::new(&DEFAULTS);
        let mut engine = Self {
            pool: VoicePool::new(|_| VaVoice::new(sample_rate)),
            params,
            cutoff_hz: 1000.0,
            resonance_q: 0.707,
            gain: SmoothedParam::with_config(poly_gain(1), sample_rate, 10.0),
        };
        engine.cutoff_hz = timbre_to_cutoff(engine.params.get(ParameterId::Timbre));
        engine.resonance_q = morph_to_q(engine.params.get(ParameterId::Morph));
        engine.refresh_voices();
        engine
    }

    /// Notes of all sounding voices, in voice order.
    pub fn active_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.pool.voices().iter().filter(|v| v.is_active()).map(|v| v.note)
    }

    /// Filter cutoff in Hz currently applied to the voices.
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    fn detune_cents(&self) -> f32 {
        self.params.get(ParameterId::Detune) * MAX_DETUNE_CENTS
    }

    fn refresh_voices(&mut self) {
        let detune = self.detune_cents();
        let (cutoff, q) = (self.cutoff_hz, self.resonance_q);
        for voice in self.pool.all_voices_mut() {
            apply_adsr(&mut voice.env, &self.params);
            voice.filter.set_cutoff(cutoff * (1.0 + voice.pressure));
            voice.filter.set_resonance(q);
            voice.tune(detune);
        }
    }
}

const DEFAULTS: [(ParameterId, f32); 12] = [
    (ParameterId::Harmonics, 0.5),
    (ParameterId::Timbre, 0.6),
    (ParameterId::Morph, 0.2),
    (ParameterId::Detune, 0.2),
    (ParameterId::SubLevel, 0.0),
    (ParameterId::FilterCutoff, 0.7),
    (ParameterId::FilterResonance, 0.05),
    (ParameterId::Volume, 0.8),
    ADSR_DEFAULTS[0],
    ADSR_DEFAULTS[1],
    ADSR_DEFAULTS[2],
    ADSR_DEFAULTS[3],
];

fn timbre_to_cutoff(t: f32) -> f32 {
    norm_to_exp(t, 200.0, 5000.0)
}

fn morph_to_q(m: f32) -> f32 {
    0.5 + 4.5 * m
}

impl SynthEngine for SubtractiveEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::MacroVa
    }

    fn description(&self) -> &'static str {
        "Two detuned saws and a sub through a resonant low-pass"
    }

    fn note_on(&mut self, note: u8, velocity: f32, aftertouch: f32) {
        if !valid_note(note) {
            return;
        }
        let playing = self.pool.playing(note).next();
        let index = match playing {
            Some(i) => i,
            None => self.pool.claim().index(),
        };
        let stamp = self.pool.next_stamp();
        let detune = self.detune_cents();
        let cutoff = self.cutoff_hz;
        let voice = &mut self.pool.voices_mut()[index];
        if !voice.is_active() {
            voice.osc1.reset();
            voice.osc2.reset();
            voice.sub.reset();
            voice.filter.reset();
        }
        voice.note = note;
        voice.velocity = clamp_unit(velocity);
        voice.pressure = clamp_unit(aftertouch);
        voice.stamp = stamp;
        voice.tune(detune);
        voice.filter.set_cutoff(cutoff * (1.0 + voice.pressure));
        voice.env.gate_on();
    }

    fn note_off(&mut self, note: u8) {
        for voice in self.pool.voices_mut() {
            if voice.is_active() && voice.note == note {
                voice.env.gate_off();
            }
        }
    }

    fn set_aftertouch(&mut self, note: u8, value: f32) {
        let pressure = clamp_unit(value);
        let cutoff = self.cutoff_hz;
        for voice in self.pool.voices_mut() {
            if voice.is_active() && voice.note == note {
                voice.pressure = pressure;
                voice.filter.set_cutoff(cutoff * (1.0 + pressure));
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
        let v = self.params.get(id);
        match id {
            ParameterId::Timbre => self.cutoff_hz = timbre_to_cutoff(v),
            ParameterId::FilterCutoff => self.cutoff_hz = 100.0 * libm::powf(2.0, 7.5 * v),
            ParameterId::Morph => self.resonance_q = morph_to_q(v),
            ParameterId::FilterResonance => self.resonance_q = 0.5 + 9.5 * v,
            ParameterId::Detune => {}
            id if is_adsr(id) => {}
            _ => return,
        }
        self.refresh_voices();
    }

    fn get_parameter(&self, id: ParameterId) -> f32 {
        self.params.get(id)
    }

    fn has_parameter(&self, id: ParameterId) -> bool {
        self.params.supports(id)
    }

    fn process(&mut self, output: &mut [AudioFrame]) {
        let mix = self.params.get(ParameterId::Harmonics);
        let sub_level = self.params.get(ParameterId::SubLevel);
        let volume = self.params.get(ParameterId::Volume);
        self.gain.set_target(poly_gain(self.pool.active_count()));
        for frame in output.iter_mut() {
            let mut sum = 0.0;
            for voice in self.pool.voices_mut() {
                if voice.is_active() {
                    sum += voice.render(mix, sub_level);
                }
            }
            let s = sum * self.gain.advance() * volume;
            *frame = AudioFrame::mono(s);
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
        #[cfg(feature = "tracing")]
        tracing::debug!(voices = self.pool.limit(), "subtractive voice limit");
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return;
        }
        self.gain.set_sample_rate(sample_rate);
        for voice in self.pool.all_voices_mut() {
            *voice = VaVoice::new(sample_rate);
        }
        self.refresh_voices();
    }

    fn supports_poly_aftertouch(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(engine: &mut SubtractiveEngine, blocks: usize) -> f32 {
        let mut buf = [AudioFrame::SILENCE; 128];
        let mut peak = 0.0f32;
        for _ in 0..blocks {
            engine.process(&mut buf);
            for f in &buf {
                assert!(f.is_finite());
                peak = peak.max(f.peak());
            }
        }
        peak
    }

    #[test]
    fn test_note_produces_sound() {
        let mut engine = SubtractiveEngine::new(48000.0);
        engine.note_on(60, 0.8, 0.0);
        assert_eq!(engine.active_voice_count(), 1);
        assert!(render(&mut engine, 10) > 0.01);
    }

    #[test]
    fn test_stolen_voice_restarts_envelope() {
        let mut engine = SubtractiveEngine::new(48000.0);
        engine.set_voice_count(1);
        engine.set_parameter(ParameterId::Attack, 1.0);
        engine.note_on(60, 1.0, 0.0);
        render(&mut engine, 200);
        let held = render(&mut engine, 1);
        engine.note_on(64, 1.0, 0.0);
        let restarted = render(&mut engine, 1);
        assert_eq!(engine.active_voice_count(), 1);
        assert!(restarted < held * 0.1, "held {held}, restarted {restarted}");
    }

    #[test]
    fn test_release_returns_to_idle() {
        let mut engine = SubtractiveEngine::new(48000.0);
        engine.note_on(60, 0.8, 0.0);
        render(&mut engine, 10);
        engine.note_off(60);
        render(&mut engine, 400);
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn test_same_note_reuses_voice() {
        let mut engine = SubtractiveEngine::new(48000.0);
        engine.note_on(60, 0.8, 0.0);
        engine.note_on(60, 0.5, 0.0);
        assert_eq!(engine.active_voice_count(), 1);
    }

    #[test]
    fn test_timbre_maps_cutoff() {
        let mut engine = SubtractiveEngine::new(48000.0);
        engine.set_parameter(ParameterId::Timbre, 0.0);
        assert!((engine.cutoff_hz() - 200.0).abs() < 0.5);
        engine.set_parameter(ParameterId::Timbre, 1.0);
        assert!((engine.cutoff_hz() - 5000.0).abs() < 1.0);
    }

    #[test]
    fn test_unsupported_parameter_ignored() {
        let mut engine = SubtractiveEngine::new(48000.0);
        assert!(!engine.has_parameter(ParameterId::ReverbMix));
        engine.set_parameter(ParameterId::ReverbMix, 0.9);
        assert_eq!(engine.get_parameter(ParameterId::ReverbMix), 0.0);
    }

    #[test]
    fn test_silence_overwrites_buffer() {
        let mut engine = SubtractiveEngine::new(48000.0);
        let mut buf = [AudioFrame::mono(0.5); 64];
        engine.process(&mut buf);
        assert!(buf.iter().all(|f| *f == AudioFrame::SILENCE));
    }
}
