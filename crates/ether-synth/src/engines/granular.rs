//! Granular engine.
//!
//! Each voice spawns Hann-windowed grains that read a short source buffer.
//! The buffer holds eight cycles that morph from a sine toward the selected
//! source waveform, so the read position also scans timbre.
//!
//! - Harmonics: source read position
//! - Timbre: density, 0.1 to 200 grains per second
//! - Morph: grain duration, 1 to 500 ms
//! - Detune: pitch jitter, up to one octave either way
//! - OscMix: stereo spread

use core::f32::consts::TAU;

use ether_core::{AudioFrame, NoiseGenerator, equal_power_pan, midi_to_freq};
use libm::{cosf, sinf, sqrtf, tanhf};

use super::{ADSR_DEFAULTS, apply_adsr, is_adsr};
use crate::engine::{SynthEngine, clamp_unit, valid_note};
use crate::engine_type::EngineType;
use crate::envelope::AdsrEnvelope;
use crate::params::{ParameterBank, ParameterId, norm_to_exp};
use crate::voice::{PolyVoice, VoicePool};

/// Samples in the grain source buffer.
pub const SOURCE_LEN: usize = 1024;
const CYCLE_LEN: usize = 128;

/// Grain capacity per voice.
pub const MAX_GRAINS: usize = 64;

/// What a grain does when its read position leaves the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMode {
    /// Stop the grain.
    #[default]
    Forward,
    /// Turn around and read backward; stop at the start.
    Reverse,
    /// Bounce between the ends.
    PingPong,
    /// Continue from a random position.
    RandomJump,
    /// Continue from the middle of the source.
    Freeze,
}

/// Source waveforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrainSource {
    /// Pure sine.
    #[default]
    Sine,
    /// Triangle.
    Triangle,
    /// Sawtooth.
    Saw,
    /// Square.
    Square,
    /// White noise.
    Noise,
    /// Eight harmonics at 1/n.
    HarmonicRich,
    /// Fundamental with a resonant fifth partial.
    Formant,
    /// Two formant bumps.
    Vocal,
}

impl GrainSource {
    fn sample(self, phase: f32, rng: &mut NoiseGenerator) -> f32 {
        let p = phase * TAU;
        match self {
            GrainSource::Sine => sinf(p),
            GrainSource::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            GrainSource::Saw => 2.0 * phase - 1.0,
            GrainSource::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            GrainSource::Noise => rng.next_bipolar(),
            GrainSource::HarmonicRich => {
                (1..=8).map(|h| sinf(p * h as f32) / h as f32).sum::<f32>() * 0.6
            }
            GrainSource::Formant => 0.6 * sinf(p) + 0.4 * sinf(5.0 * p) * (1.0 - phase),
            GrainSource::Vocal => {
                0.5 * sinf(p) + 0.3 * sinf(3.0 * p) + 0.15 * sinf(7.0 * p) + 0.05 * sinf(11.0 * p)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Grain {
    active: bool,
    pos: f32,
    inc: f32,
    age: u32,
    len: u32,
    left: f32,
    right: f32,
}

#[derive(Debug, Clone)]
struct GranularVoice {
    grains: [Grain; MAX_GRAINS],
    env: AdsrEnvelope,
    countdown: f32,
    note_ratio: f32,
    note: u8,
    velocity: f32,
    stamp: u64,
}

impl GranularVoice {
    fn new(sample_rate: f32) -> Self {
        Self {
            grains: [Grain::default(); MAX_GRAINS],
            env: AdsrEnvelope::new(sample_rate),
            countdown: 0.0,
            note_ratio: 1.0,
            note: 0,
            velocity: 0.0,
            stamp: 0,
        }
    }

    fn active_grains(&self) -> usize {
        self.grains.iter().filter(|g| g.active).count()
    }
}

impl PolyVoice for GranularVoice {
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
        for g in &mut self.grains {
            g.active = false;
        }
    }
}

/// Per-block grain spawning settings.
#[derive(Debug, Clone, Copy)]
struct Spawn {
    interval: f32,
    len: u32,
    position: f32,
    position_jitter: f32,
    pitch: f32,
    pitch_jitter: f32,
    spread: f32,
    norm: f32,
}

const DEFAULTS: [(ParameterId, f32); 10] = [
    (ParameterId::Harmonics, 0.2),
    (ParameterId::Timbre, 0.7),
    (ParameterId::Morph, 0.55),
    (ParameterId::Detune, 0.0),
    (ParameterId::OscMix, 0.3),
    (ParameterId::Volume, 0.8),
    ADSR_DEFAULTS[0],
    ADSR_DEFAULTS[1],
    ADSR_DEFAULTS[2],
    ADSR_DEFAULTS[3],
];

/// Polyphonic granular synthesizer.
pub struct GranularEngine {
    pool: VoicePool<GranularVoice>,
    params: ParameterBank,
    source: [f32; SOURCE_LEN],
    source_kind: GrainSource,
    texture: TextureMode,
    position_jitter: f32,
    grain_pitch: f32,
    rng: NoiseGenerator,
    sample_rate: f32,
}

impl GranularEngine {
    /// New engine reading a sine-to-harmonic-rich source.
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            pool: VoicePool::new(|_| GranularVoice::new(sample_rate)),
            params: ParameterBank::new(&DEFAULTS),
            source: [0.0; SOURCE_LEN],
            source_kind: GrainSource::HarmonicRich,
            texture: TextureMode::Forward,
            position_jitter: 0.05,
            grain_pitch: 1.0,
            rng: NoiseGenerator::new(0x6A09_E667),
            sample_rate,
        };
        engine.set_source(GrainSource::HarmonicRich);
        engine.refresh_voices();
        engine
    }

    /// Rebuild the source buffer for `kind`.
    pub fn set_source(&mut self, kind: GrainSource) {
        self.source_kind = kind;
        let mut rng = NoiseGenerator::new(0x1F83_D9AB);
        for (i, s) in self.source.iter_mut().enumerate() {
            let phase = (i % CYCLE_LEN) as f32 / CYCLE_LEN as f32;
            let morph = i as f32 / (SOURCE_LEN - 1) as f32;
            let sine = sinf(phase * TAU);
            *s = sine + (kind.sample(phase, &mut rng) - sine) * morph;
        }
    }

    /// Current source waveform.
    pub fn source(&self) -> GrainSource {
        self.source_kind
    }

    /// Behaviour at the source edges.
    pub fn set_texture_mode(&mut self, mode: TextureMode) {
        self.texture = mode;
    }

    /// Current texture mode.
    pub fn texture_mode(&self) -> TextureMode {
        self.texture
    }

    /// Random start offset as a fraction of the source, 0 to 1.
    pub fn set_position_jitter(&mut self, amount: f32) {
        self.position_jitter = clamp_unit(amount);
    }

    /// Grain playback ratio, 0.1x to 8x.
    pub fn set_grain_pitch(&mut self, ratio: f32) {
        if ratio.is_finite() {
            self.grain_pitch = ratio.clamp(0.1, 8.0);
        }
    }

    /// Grains per second from Timbre.
    pub fn density(&self) -> f32 {
        norm_to_exp(self.params.get(ParameterId::Timbre), 0.1, 200.0)
    }

    /// Grain duration in ms from Morph.
    pub fn grain_ms(&self) -> f32 {
        norm_to_exp(self.params.get(ParameterId::Morph), 1.0, 500.0)
    }

    /// Sounding grains across all voices.
    pub fn active_grains(&self) -> usize {
        self.pool.voices().iter().map(GranularVoice::active_grains).sum()
    }

    fn refresh_voices(&mut self) {
        for voice in self.pool.all_voices_mut() {
            apply_adsr(&mut voice.env, &self.params);
        }
    }

    fn spawn_settings(&self) -> Spawn {
        let density = self.density();
        let len_s = self.grain_ms() / 1000.0;
        let overlap = (density * len_s).max(1.0);
        Spawn {
            interval: self.sample_rate / density,
            len: (len_s * self.sample_rate).max(1.0) as u32,
            position: self.params.get(ParameterId::Harmonics),
            position_jitter: self.position_jitter,
            pitch: self.grain_pitch,
            pitch_jitter: self.params.get(ParameterId::Detune),
            spread: self.params.get(ParameterId::OscMix),
            norm: 1.0 / sqrtf(overlap),
        }
    }
}

fn spawn_grain(voice: &mut GranularVoice, spawn: &Spawn, rng: &mut NoiseGenerator) {
    let Some(grain) = voice.grains.iter_mut().find(|g| !g.active) else {
        return;
    };
    let start = (spawn.position + spawn.position_jitter * rng.next_bipolar()).clamp(0.0, 1.0);
    let semis = spawn.pitch_jitter * 12.0 * rng.next_bipolar();
    let ratio = (spawn.pitch * libm::powf(2.0, semis / 12.0)).clamp(0.1, 8.0);
    let inc = ratio * voice.note_ratio;
    let (left, right) = equal_power_pan(spawn.spread * rng.next_bipolar());
    *grain = Grain {
        active: true,
        pos: start * (SOURCE_LEN - 1) as f32,
        inc,
        age: 0,
        len: spawn.len,
        left,
        right,
    };
}

#[inline]
fn read_source(source: &[f32; SOURCE_LEN], pos: f32) -> f32 {
    let i0 = (pos as usize).min(SOURCE_LEN - 1);
    let i1 = (i0 + 1).min(SOURCE_LEN - 1);
    let frac = pos - i0 as f32;
    source[i0] + (source[i1] - source[i0]) * frac
}

impl SynthEngine for GranularEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::Granular
    }

    fn description(&self) -> &'static str {
        "Hann-windowed grains over a morphing source"
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
        let base_freq = self.sample_rate / CYCLE_LEN as f32;
        let ratio = midi_to_freq(f32::from(note)) / base_freq;
        let voice = &mut self.pool.voices_mut()[index];
        if !voice.is_active() {
            for g in &mut voice.grains {
                g.active = false;
            }
        }
        voice.note = note;
        voice.velocity = clamp_unit(velocity);
        voice.stamp = stamp;
        voice.note_ratio = ratio;
        voice.countdown = 0.0;
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
        if self.params.set(id, value) && is_adsr(id) {
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
        let spawn = self.spawn_settings();
        let volume = self.params.get(ParameterId::Volume);
        let texture = self.texture;
        let end = (SOURCE_LEN - 1) as f32;
        for frame in output.iter_mut() {
            let mut mix = AudioFrame::SILENCE;
            for voice in self.pool.voices_mut() {
                if !voice.is_active() {
                    continue;
                }
                voice.countdown -= 1.0;
                if voice.countdown <= 0.0 {
                    spawn_grain(voice, &spawn, &mut self.rng);
                    voice.countdown += spawn.interval;
                }
                let mut left = 0.0;
                let mut right = 0.0;
                for g in voice.grains.iter_mut().filter(|g| g.active) {
                    let window = 0.5 * (1.0 - cosf(TAU * g.age as f32 / g.len as f32));
                    let s = read_source(&self.source, g.pos) * window;
                    left += s * g.left;
                    right += s * g.right;
                    g.age += 1;
                    if g.age >= g.len {
                        g.active = false;
                        continue;
                    }
                    g.pos += g.inc;
                    if g.pos < 0.0 || g.pos > end {
                        match texture {
                            TextureMode::Forward => g.active = false,
                            TextureMode::Reverse => {
                                if g.pos < 0.0 {
                                    g.active = false;
                                } else {
                                    g.inc = -g.inc.abs();
                                    g.pos = end;
                                }
                            }
                            TextureMode::PingPong => {
                                g.inc = -g.inc;
                                g.pos = g.pos.clamp(0.0, end);
                            }
                            TextureMode::RandomJump => g.pos = self.rng.next_unipolar() * end,
                            TextureMode::Freeze => g.pos = end * 0.5,
                        }
                    }
                }
                let amp = voice.env.advance() * voice.velocity;
                mix.left += tanhf(left * spawn.norm) * amp;
                mix.right += tanhf(right * spawn.norm) * amp;
            }
            *frame = mix * (volume * 0.5);
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
        for voice in self.pool.all_voices_mut() {
            *voice = GranularVoice::new(sample_rate);
        }
        self.refresh_voices();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(engine: &mut GranularEngine, blocks: usize) -> f32 {
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
    fn test_macro_ranges() {
        let mut engine = GranularEngine::new(48000.0);
        engine.set_parameter(ParameterId::Timbre, 0.0);
        engine.set_parameter(ParameterId::Morph, 1.0);
        assert!((engine.density() - 0.1).abs() < 1e-4);
        assert!((engine.grain_ms() - 500.0).abs() < 0.1);
        engine.set_parameter(ParameterId::Timbre, 1.0);
        assert!((engine.density() - 200.0).abs() < 0.1);
    }

    #[test]
    fn test_grains_spawn_and_sound() {
        let mut engine = GranularEngine::new(48000.0);
        engine.note_on(60, 1.0, 0.0);
        let peak = run(&mut engine, 20);
        assert!(engine.active_grains() > 0);
        assert!(peak > 1e-3 && peak <= 1.0, "peak {peak}");
    }

    #[test]
    fn test_grain_capacity() {
        let mut engine = GranularEngine::new(48000.0);
        engine.set_parameter(ParameterId::Timbre, 1.0);
        engine.set_parameter(ParameterId::Morph, 1.0);
        engine.note_on(48, 1.0, 0.0);
        run(&mut engine, 400);
        assert!(engine.active_grains() <= MAX_GRAINS);
    }

    #[test]
    fn test_texture_modes_stay_finite() {
        for mode in [
            TextureMode::Forward,
            TextureMode::Reverse,
            TextureMode::PingPong,
            TextureMode::RandomJump,
            TextureMode::Freeze,
        ] {
            let mut engine = GranularEngine::new(48000.0);
            engine.set_texture_mode(mode);
            engine.set_grain_pitch(8.0);
            engine.set_parameter(ParameterId::Harmonics, 0.95);
            engine.note_on(96, 1.0, 0.0);
            run(&mut engine, 50);
            assert_eq!(engine.texture_mode(), mode);
        }
    }

    fn edge_engine(mode: TextureMode, position: f32) -> GranularEngine {
        let mut engine = GranularEngine::new(48000.0);
        engine.set_texture_mode(mode);
        engine.set_position_jitter(0.0);
        engine.set_parameter(ParameterId::Harmonics, position);
        engine.set_parameter(ParameterId::Timbre, 0.0);
        engine.set_parameter(ParameterId::Morph, 1.0);
        engine.note_on(60, 1.0, 0.0);
        engine
    }

    fn first_grain(engine: &GranularEngine) -> Option<Grain> {
        engine
            .pool
            .voices()
            .iter()
            .flat_map(|v| v.grains.iter())
            .find(|g| g.active)
            .copied()
    }

    fn step(engine: &mut GranularEngine) -> Option<Grain> {
        let mut frame = [AudioFrame::SILENCE; 1];
        engine.process(&mut frame);
        first_grain(engine)
    }

    #[test]
    fn test_forward_stops_at_end() {
        let mut engine = edge_engine(TextureMode::Forward, 1.0);
        assert!(step(&mut engine).is_none());
    }

    #[test]
    fn test_reverse_sounds_from_start() {
        let mut forward = edge_engine(TextureMode::Forward, 0.0);
        let mut reverse = edge_engine(TextureMode::Reverse, 0.0);
        assert!(run(&mut forward, 40) > 1e-3);
        assert!(run(&mut reverse, 40) > 1e-3);
    }

    #[test]
    fn test_reverse_turns_back_then_stops() {
        let mut engine = edge_engine(TextureMode::Reverse, 0.0);
        let first = step(&mut engine).expect("grain spawned");
        assert!(first.inc > 0.0);

        let mut turned = false;
        let mut last_pos = f32::MAX;
        for _ in 0..4000 {
            match step(&mut engine) {
                Some(g) if g.inc < 0.0 => {
                    if turned {
                        assert!(g.pos < last_pos);
                    }
                    turned = true;
                    last_pos = g.pos;
                }
                Some(_) => assert!(!turned),
                None => break,
            }
        }
        assert!(turned);
        // reached the start before the grain window ran out
        assert!(first_grain(&engine).is_none());
    }

    #[test]
    fn test_ping_pong_bounces() {
        let mut engine = edge_engine(TextureMode::PingPong, 1.0);
        let end = (SOURCE_LEN - 1) as f32;
        let mut saw_backward = false;
        let mut bounced = false;
        for _ in 0..2000 {
            let g = step(&mut engine).expect("grain kept alive");
            assert!((0.0..=end).contains(&g.pos));
            if g.inc < 0.0 {
                saw_backward = true;
            } else if saw_backward {
                bounced = true;
            }
        }
        assert!(saw_backward && bounced);
    }

    #[test]
    fn test_freeze_holds_upper_half() {
        let mut engine = edge_engine(TextureMode::Freeze, 1.0);
        let end = (SOURCE_LEN - 1) as f32;
        for _ in 0..4000 {
            let g = step(&mut engine).expect("grain kept alive");
            assert!(g.inc > 0.0);
            assert!(g.pos >= end * 0.5 && g.pos <= end, "pos {}", g.pos);
        }
    }

    #[test]
    fn test_random_jump_stays_in_range() {
        let mut engine = edge_engine(TextureMode::RandomJump, 1.0);
        let end = (SOURCE_LEN - 1) as f32;
        let mut jumped_low = false;
        for _ in 0..20_000 {
            let g = step(&mut engine).expect("grain kept alive");
            assert!((0.0..=end).contains(&g.pos));
            jumped_low |= g.pos < end * 0.5;
        }
        assert!(jumped_low);
    }

    #[test]
    fn test_release_stops_voice() {
        let mut engine = GranularEngine::new(48000.0);
        engine.note_on(60, 1.0, 0.0);
        run(&mut engine, 10);
        engine.note_off(60);
        run(&mut engine, 400);
        assert_eq!(engine.active_voice_count(), 0);
    }
}
