//! Wavetable engine with vector-path morphing.
//!
//! Each voice reads four corner sources from the shared [`WavetableBank`]
//! and blends them with equal-power weights taken from a point on a
//! [`VectorPath`].
//!
//! - Harmonics: scan position through the bank (corners sit two tables apart)
//! - Timbre: formant shift of ±6 semitones by read-phase warp, plus ±3 dB tilt
//! - Morph: position along the path, by arc length
//!
//! With a non-zero path playback rate the [`PathLatch`] moves the position on
//! its own at a constant arc-length speed, free-running or locked to the host
//! tempo; Morph then offsets the moving point.

use alloc::sync::Arc;

use ether_core::{AudioFrame, OnePole, SmoothedParam, db_to_linear, midi_to_freq};

use super::{ADSR_DEFAULTS, apply_adsr, is_adsr, poly_gain};
use crate::engine::{SynthEngine, clamp_unit, valid_note};
use crate::engine_type::EngineType;
use crate::envelope::AdsrEnvelope;
use crate::params::{ParameterBank, ParameterId};
use crate::path_latch::{BeatDivision, LatchMode, LatchSync, PathLatch};
use crate::vector_path::{PathPreset, VectorPath, corner_weights};
use crate::voice::{PolyVoice, VoicePool};
use crate::wavetable::{TABLE_COUNT, WavetableBank};

const TILT_SPLIT_HZ: f32 = 1000.0;
const MAX_TILT_DB: f32 = 3.0;

#[derive(Debug, Clone)]
struct WtVoice {
    phase: f32,
    inc: f32,
    level: usize,
    env: AdsrEnvelope,
    split: OnePole,
    note: u8,
    velocity: f32,
    stamp: u64,
}

impl WtVoice {
    fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            inc: 0.0,
            level: 0,
            env: AdsrEnvelope::new(sample_rate),
            split: OnePole::new(sample_rate, TILT_SPLIT_HZ),
            note: 0,
            velocity: 0.0,
            stamp: 0,
        }
    }
}

impl PolyVoice for WtVoice {
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
        self.split.reset();
    }
}

/// Per-block snapshot of the timbre controls.
#[derive(Debug, Clone, Copy)]
struct Shape {
    scans: [f32; 4],
    weights: [f32; 4],
    warp: f32,
    low_gain: f32,
    high_gain: f32,
}

const DEFAULTS: [(ParameterId, f32); 8] = [
    (ParameterId::Harmonics, 0.0),
    (ParameterId::Timbre, 0.5),
    (ParameterId::Morph, 0.0),
    (ParameterId::Volume, 0.8),
    ADSR_DEFAULTS[0],
    ADSR_DEFAULTS[1],
    ADSR_DEFAULTS[2],
    ADSR_DEFAULTS[3],
];

/// Polyphonic four-corner wavetable synthesizer.
pub struct WavetableEngine {
    pool: VoicePool<WtVoice>,
    params: ParameterBank,
    bank: Arc<WavetableBank>,
    path: VectorPath,
    latch: PathLatch,
    path_point: (f32, f32),
    sample_rate: f32,
    gain: SmoothedParam,
}

impl WavetableEngine {
    /// New engine on a circular path, with the process-wide table bank.
    pub fn new(sample_rate: f32) -> Self {
        let path = VectorPath::preset(PathPreset::Circle);
        let path_point = path.position(0.0);
        let mut engine = Self {
            pool: VoicePool::new(|_| WtVoice::new(sample_rate)),
            params: ParameterBank::new(&DEFAULTS),
            bank: WavetableBank::shared(),
            path,
            latch: PathLatch::new(),
            path_point,
            sample_rate,
            gain: SmoothedParam::with_config(poly_gain(1), sample_rate, 10.0),
        };
        engine.refresh_voices();
        engine
    }

    /// Replace the morph path.
    pub fn set_path(&mut self, path: VectorPath) {
        self.path = path;
        self.update_path_point();
    }

    /// Load a built-in path.
    pub fn set_path_preset(&mut self, preset: PathPreset) {
        self.set_path(VectorPath::preset(preset));
    }

    /// Current path.
    pub fn path(&self) -> &VectorPath {
        &self.path
    }

    /// Latch the path: traverse it `rate` times per second, or per beat
    /// division or bar when tempo-locked. Zero stops it.
    pub fn set_path_playback_rate(&mut self, rate: f32) {
        self.latch.set_rate(rate);
    }

    /// Direction and shape of latched motion.
    pub fn set_latch_mode(&mut self, mode: LatchMode) {
        self.latch.set_mode(mode);
    }

    /// Lock latched motion to the host tempo.
    pub fn set_latch_sync(&mut self, sync: LatchSync) {
        self.latch.set_sync(sync);
    }

    /// Loop length when locked to beats.
    pub fn set_latch_division(&mut self, division: BeatDivision) {
        self.latch.set_division(division);
    }

    /// The path latch.
    pub fn latch(&self) -> &PathLatch {
        &self.latch
    }

    /// Fraction of the path's arc length at the current morph point.
    pub fn path_progress(&self) -> f32 {
        wrap(self.latch.progress() + self.params.get(ParameterId::Morph))
    }

    /// Current point on the plane.
    pub fn path_position(&self) -> (f32, f32) {
        self.path_point
    }

    fn update_path_point(&mut self) {
        self.path_point = self.path.position(self.path_progress());
    }

    fn refresh_voices(&mut self) {
        for voice in self.pool.all_voices_mut() {
            apply_adsr(&mut voice.env, &self.params);
        }
    }

    fn shape(&self) -> Shape {
        let h = self.params.get(ParameterId::Harmonics);
        let t = self.params.get(ParameterId::Timbre) - 0.5;
        let scan = h * (TABLE_COUNT - 1) as f32;
        let tilt_db = t * 2.0 * MAX_TILT_DB;
        Shape {
            scans: core::array::from_fn(|c| scan + 2.0 * c as f32),
            weights: corner_weights(self.path_point.0, self.path_point.1),
            warp: libm::powf(2.0, t),
            low_gain: db_to_linear(-tilt_db),
            high_gain: db_to_linear(tilt_db),
        }
    }
}

#[inline]
fn wrap(v: f32) -> f32 {
    v - libm::floorf(v)
}

impl SynthEngine for WavetableEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::MacroWavetable
    }

    fn description(&self) -> &'static str {
        "Four-corner wavetable morphing along a vector path"
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
        let freq = midi_to_freq(f32::from(note));
        let sample_rate = self.sample_rate;
        let voice = &mut self.pool.voices_mut()[index];
        if !voice.is_active() {
            voice.phase = 0.0;
            voice.split.reset();
        }
        voice.note = note;
        voice.velocity = clamp_unit(velocity);
        voice.stamp = stamp;
        voice.inc = freq / sample_rate;
        voice.level = WavetableBank::level_for(freq * 2.0, sample_rate);
        voice.env.gate_on();
    }

    fn note_off(&mut self, note: u8) {
        for voice in self.pool.voices_mut() {
            if voice.is_active() && voice.note == note {
                voice.env.gate_off();
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
        if id == ParameterId::Morph {
            self.update_path_point();
        } else if is_adsr(id) {
            self.refresh_voices();
        }
    }

    fn get_parameter(&self, id: ParameterId) -> f32 {
        self.params.get(id)
    }

    fn has_parameter(&self, id: ParameterId) -> bool {
        self.params.supports(id)
    }

    fn process(&mut self, output: &mut [AudioFrame]) {
        if self.latch.is_latched() {
            let block = output.len() as f32 / self.sample_rate;
            self.latch.advance(block, &self.path);
            self.update_path_point();
        }
        let shape = self.shape();
        let volume = self.params.get(ParameterId::Volume);
        self.gain.set_target(poly_gain(self.pool.active_count()));
        let bank = &*self.bank;
        for frame in output.iter_mut() {
            let mut sum = 0.0;
            for voice in self.pool.voices_mut() {
                if !voice.is_active() {
                    continue;
                }
                let read = wrap(voice.phase * shape.warp);
                let mut s = 0.0;
                for c in 0..4 {
                    if shape.weights[c] > 0.0 {
                        s += shape.weights[c] * bank.read_scanned(shape.scans[c], voice.level, read);
                    }
                }
                let low = voice.split.process(s);
                let tilted = low * shape.low_gain + (s - low) * shape.high_gain;
                sum += tilted * voice.env.advance() * voice.velocity;
                voice.phase = wrap(voice.phase + voice.inc);
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

    fn set_tempo(&mut self, bpm: f32) {
        self.latch.set_bpm(bpm);
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return;
        }
        self.sample_rate = sample_rate;
        self.gain.set_sample_rate(sample_rate);
        for voice in self.pool.all_voices_mut() {
            *voice = WtVoice::new(sample_rate);
        }
        self.refresh_voices();
    }
}
