//! Monophonic slide/accent bass.
//!
//! Saw/square blend with a sub-octave square, tanh drive and a resonant
//! low-pass with key tracking, an amp ADSR and a fixed-shape filter envelope.
//! Overlapping notes glide in note space (so pitch moves exponentially in Hz)
//! along an eased curve. Loud notes get an accent that briefly lifts level,
//! cutoff, resonance and drive.
//!
//! - Harmonics: base cutoff, 20 Hz to 12 kHz exponential
//! - Timbre: saw-to-square shape and drive
//! - Morph: portamento scale (0.1x to 2x) and accent length
//!
//! A note is legato when another key is still held, or when the previous note
//! started less than 100 ms ago and is still sounding.

use ether_core::{AudioFrame, StateVariableFilter, SvfOutput, db_to_linear, midi_to_freq};
use libm::{expf, powf, tanhf};

use super::{apply_adsr, is_adsr};
use crate::engine::{SynthEngine, clamp_unit, valid_note};
use crate::engine_type::EngineType;
use crate::envelope::AdsrEnvelope;
use crate::oscillator::{Oscillator, Waveform};
use crate::params::{ParameterBank, ParameterId};

const LEGATO_WINDOW_MS: f32 = 100.0;
const ACCENT_THRESHOLD: f32 = 100.0 / 127.0;
const DEFAULT_ACCENT_MS: f32 = 50.0;
const DEFAULT_CURVE: f32 = 0.7;
const FILTER_ENV_OCTAVES: f32 = 2.5;
const KEY_TRACK: f32 = 0.5;
const HELD_CAPACITY: usize = 8;

/// When overlapping notes glide instead of jumping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideMode {
    /// Never glide.
    Off,
    /// Glide between legato notes.
    #[default]
    LegatoOnly,
    /// Glide whenever a note is still sounding.
    Always,
    /// Glide only into accented legato notes.
    AccentOnly,
}

#[derive(Debug, Clone, Copy)]
struct Slide {
    from: f32,
    to: f32,
    pos: u32,
    len: u32,
}

const DEFAULTS: [(ParameterId, f32); 10] = [
    (ParameterId::Harmonics, 0.5),
    (ParameterId::Timbre, 0.3),
    (ParameterId::Morph, 0.5),
    (ParameterId::SubLevel, 0.3),
    (ParameterId::FilterResonance, 0.3),
    (ParameterId::Volume, 0.8),
    (ParameterId::Attack, 0.0),
    (ParameterId::Decay, 0.4),
    (ParameterId::Sustain, 0.8),
    (ParameterId::Release, 0.2),
];

/// Single-voice bass with portamento and accent.
pub struct SlideBassEngine {
    params: ParameterBank,
    saw: Oscillator,
    square: Oscillator,
    sub: Oscillator,
    filter: StateVariableFilter,
    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,
    sample_rate: f32,
    current: f32,
    slide: Option<Slide>,
    held: [u8; HELD_CAPACITY],
    held_len: usize,
    since_note_on: u32,
    velocity: f32,
    accent: f32,
    accent_phase: f32,
    slide_mode: SlideMode,
    curve: f32,
    fixed_slide_ms: Option<f32>,
    accent_ms: f32,
}

impl SlideBassEngine {
    /// New engine, silent, in legato-only slide mode.
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            params: ParameterBank::new(&DEFAULTS),
            saw: Oscillator::new(sample_rate),
            square: Oscillator::new(sample_rate),
            sub: Oscillator::new(sample_rate),
            filter: StateVariableFilter::new(sample_rate),
            amp_env: AdsrEnvelope::new(sample_rate),
            filter_env: AdsrEnvelope::new(sample_rate),
            sample_rate,
            current: 60.0,
            slide: None,
            held: [0; HELD_CAPACITY],
            held_len: 0,
            since_note_on: u32::MAX,
            velocity: 0.0,
            accent: 0.0,
            accent_phase: 1.0,
            slide_mode: SlideMode::default(),
            curve: DEFAULT_CURVE,
            fixed_slide_ms: None,
            accent_ms: DEFAULT_ACCENT_MS,
        };
        engine.init_dsp();
        engine
    }

    fn init_dsp(&mut self) {
        let sr = self.sample_rate;
        self.saw = Oscillator::new(sr);
        self.saw.set_waveform(Waveform::Saw);
        self.square = Oscillator::new(sr);
        self.square.set_waveform(Waveform::Square);
        self.sub = Oscillator::new(sr);
        self.sub.set_waveform(Waveform::Square);
        self.filter = StateVariableFilter::new(sr);
        self.filter.set_output_type(SvfOutput::Lowpass);
        self.amp_env = AdsrEnvelope::new(sr);
        apply_adsr(&mut self.amp_env, &self.params);
        self.filter_env = AdsrEnvelope::new(sr);
        self.filter_env.set_attack_ms(1.0);
        self.filter_env.set_decay_ms(300.0);
        self.filter_env.set_sustain(0.3);
        self.filter_env.set_release_ms(100.0);
    }

    /// Current slide policy.
    pub fn slide_mode(&self) -> SlideMode {
        self.slide_mode
    }

    /// Change the slide policy.
    pub fn set_slide_mode(&mut self, mode: SlideMode) {
        self.slide_mode = mode;
    }

    /// Slide curve: below 0.5 eases in, above eases out, 0.5 is linear.
    pub fn set_slide_curve(&mut self, curve: f32) {
        if curve.is_finite() {
            self.curve = curve.clamp(0.0, 1.0);
        }
    }

    /// Use a fixed slide time, or `None` for interval-scaled timing.
    pub fn set_slide_time_ms(&mut self, ms: Option<f32>) {
        self.fixed_slide_ms = ms.filter(|m| m.is_finite() && *m > 0.0);
    }

    /// Base accent decay time before Morph scaling.
    pub fn set_accent_decay_ms(&mut self, ms: f32) {
        if ms.is_finite() && ms > 0.0 {
            self.accent_ms = ms;
        }
    }

    /// Sounding pitch as a fractional MIDI note.
    pub fn current_note(&self) -> f32 {
        self.current
    }

    /// Whether a glide is in progress.
    pub fn is_sliding(&self) -> bool {
        self.slide.is_some()
    }

    /// Current accent boost, 0 to 1.
    pub fn accent_level(&self) -> f32 {
        if self.accent_phase >= 1.0 {
            0.0
        } else {
            self.accent * expf(-5.0 * self.accent_phase)
        }
    }

    fn target_note(&self) -> f32 {
        self.slide.map_or(self.current, |s| s.to)
    }

    fn portamento(&self) -> f32 {
        0.1 + 1.9 * self.params.get(ParameterId::Morph)
    }

    fn slide_ms(&self, from: f32, to: f32) -> f32 {
        self.fixed_slide_ms.unwrap_or_else(|| {
            // interval only; velocity does not change the slide time
            let span = ((to - from).abs() / 12.0).clamp(0.0, 1.0);
            (5.0 + span * 115.0) * self.portamento()
        })
    }

    fn is_legato(&self) -> bool {
        let window = (LEGATO_WINDOW_MS * 0.001 * self.sample_rate) as u32;
        self.held_len > 0 || (self.amp_env.is_active() && self.since_note_on < window)
    }

    fn push_held(&mut self, note: u8) {
        self.remove_held(note);
        if self.held_len == HELD_CAPACITY {
            self.held.copy_within(1.., 0);
            self.held_len -= 1;
        }
        self.held[self.held_len] = note;
        self.held_len += 1;
    }

    fn remove_held(&mut self, note: u8) -> bool {
        match self.held[..self.held_len].iter().position(|&n| n == note) {
            Some(i) => {
                self.held.copy_within(i + 1..self.held_len, i);
                self.held_len -= 1;
                true
            }
            None => false,
        }
    }

    fn glide_to(&mut self, note: f32) {
        let ms = self.slide_ms(self.current, note);
        let len = ((ms * 0.001 * self.sample_rate) as u32).max(1);
        self.slide = Some(Slide {
            from: self.current,
            to: note,
            pos: 0,
            len,
        });
    }

    fn jump_to(&mut self, note: f32) {
        self.current = note;
        self.slide = None;
        self.saw.reset();
        self.square.reset();
        self.sub.reset();
    }

    #[inline]
    fn ease(&self, p: f32) -> f32 {
        let c = self.curve;
        if c < 0.5 {
            powf(p, 1.0 + (0.5 - c) * 6.0)
        } else {
            1.0 - powf(1.0 - p, 1.0 + (c - 0.5) * 6.0)
        }
    }

    #[inline]
    fn step_slide(&mut self) {
        if let Some(mut s) = self.slide {
            s.pos += 1;
            if s.pos >= s.len {
                self.current = s.to;
                self.slide = None;
            } else {
                let p = s.pos as f32 / s.len as f32;
                self.current = s.from + (s.to - s.from) * self.ease(p);
                self.slide = Some(s);
            }
        }
    }
}

impl SynthEngine for SlideBassEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::SlideAccentBass
    }

    fn description(&self) -> &'static str {
        "Monophonic bass with slide and accent"
    }

    fn note_on(&mut self, note: u8, velocity: f32, _aftertouch: f32) {
        if !valid_note(note) {
            return;
        }
        let velocity = clamp_unit(velocity);
        let legato = self.is_legato();
        let sounding = self.amp_env.is_active();
        let accent = if velocity >= ACCENT_THRESHOLD {
            (velocity - ACCENT_THRESHOLD) / (1.0 - ACCENT_THRESHOLD)
        } else {
            0.0
        };
        let slide = sounding
            && match self.slide_mode {
                SlideMode::Off => false,
                SlideMode::LegatoOnly => legato,
                SlideMode::Always => true,
                SlideMode::AccentOnly => legato && accent > 0.0,
            };

        if slide {
            self.glide_to(f32::from(note));
        } else {
            self.jump_to(f32::from(note));
        }
        if !(slide && legato) {
            self.amp_env.gate_on();
            self.filter_env.gate_on();
        }
        if accent > 0.0 {
            self.accent = accent;
            self.accent_phase = 0.0;
        }
        self.velocity = velocity;
        self.since_note_on = 0;
        self.push_held(note);

        #[cfg(feature = "tracing")]
        tracing::trace!(note, slide, legato, accent, "bass note on");
    }

    fn note_off(&mut self, note: u8) {
        if !self.remove_held(note) {
            return;
        }
        if self.held_len > 0 {
            let last = f32::from(self.held[self.held_len - 1]);
            if (last - self.target_note()).abs() > f32::EPSILON {
                if self.slide_mode == SlideMode::Off {
                    self.jump_to(last);
                } else {
                    self.glide_to(last);
                }
            }
        } else {
            self.amp_env.gate_off();
            self.filter_env.gate_off();
        }
    }

    fn all_notes_off(&mut self) {
        self.held_len = 0;
        self.slide = None;
        self.accent_phase = 1.0;
        self.amp_env.reset();
        self.filter_env.reset();
        self.filter.reset();
    }

    fn set_parameter(&mut self, id: ParameterId, value: f32) {
        if self.params.set(id, value) && is_adsr(id) {
            apply_adsr(&mut self.amp_env, &self.params);
        }
    }

    fn get_parameter(&self, id: ParameterId) -> f32 {
        self.params.get(id)
    }

    fn has_parameter(&self, id: ParameterId) -> bool {
        self.params.supports(id)
    }

    fn process(&mut self, output: &mut [AudioFrame]) {
        let h = self.params.get(ParameterId::Harmonics);
        let t = self.params.get(ParameterId::Timbre);
        let sub_level = self.params.get(ParameterId::SubLevel);
        let base_q = 0.5 + 9.5 * self.params.get(ParameterId::FilterResonance);
        let volume = self.params.get(ParameterId::Volume);
        let base_cutoff = 20.0 * powf(600.0, h);
        let base_drive = 0.2 * (1.0 + 2.0 * t);
        let accent_step = 1.0 / (self.accent_ms * (0.5 + self.params.get(ParameterId::Morph)) * 0.001 * self.sample_rate);
        let level = 0.5 + 0.5 * self.velocity;

        for frame in output.iter_mut() {
            if !self.amp_env.is_active() {
                *frame = AudioFrame::SILENCE;
                self.since_note_on = self.since_note_on.saturating_add(1);
                continue;
            }
            self.step_slide();
            let boost = self.accent_level();
            if self.accent_phase < 1.0 {
                self.accent_phase += accent_step;
            }

            let freq = midi_to_freq(self.current);
            self.saw.set_frequency(freq);
            self.square.set_frequency(freq);
            self.sub.set_frequency(freq * 0.5);
            let shape = self.saw.advance() * (1.0 - t) + self.square.advance() * t;
            let raw = shape + self.sub.advance() * sub_level;

            let drive = base_drive * (1.0 + 0.25 * boost);
            let driven = tanhf(raw * (1.0 + 3.0 * drive)) * 0.7;

            let track = powf(2.0, (self.current - 60.0) / 12.0 * KEY_TRACK);
            let env = powf(2.0, FILTER_ENV_OCTAVES * self.filter_env.advance());
            let cutoff = (base_cutoff * track * env * (1.0 + 0.2 * boost)).clamp(20.0, 12000.0);
            self.filter.set_cutoff(cutoff);
            self.filter.set_resonance(base_q * (1.0 + 0.15 * boost));

            let gain = self.amp_env.advance() * level * db_to_linear(6.0 * boost) * volume;
            *frame = AudioFrame::mono(self.filter.process(driven) * gain);
            self.since_note_on = self.since_note_on.saturating_add(1);
        }
    }

    fn active_voice_count(&self) -> usize {
        usize::from(self.amp_env.is_active())
    }

    fn max_voice_count(&self) -> usize {
        1
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return;
        }
        self.sample_rate = sample_rate;
        self.slide = None;
        self.init_dsp();
    }
}
