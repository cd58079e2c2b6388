//! Synthesized drum kit.
//!
//! One voice per hit, built from a small set of elements: pitch-swept sines
//! (kick, toms), high-passed noise clicks, dual-tone plus filtered-noise
//! snares, a four-pulse Gaussian clap, and six-partial inharmonic square
//! clusters for hats and cymbals. Every envelope is a per-sample exponential
//! multiplier `exp(-1000 / (ms * sample_rate))`.
//!
//! - Harmonics: global tune, one octave either way
//! - Timbre: below 0.5 selects 808-style recipes, above selects 909
//! - Morph: decay scale, 0.25x to 2x
//!
//! A voice ends when its amplitude falls below 1e-5 or its sound's maximum
//! length elapses. Closed and pedal hats choke any sounding open hat.

use core::f32::consts::TAU;

use ether_core::{
    AudioFrame, Biquad, NoiseGenerator, OnePole, OnePoleMode, equal_power_pan,
    highpass_coefficients, lowpass_coefficients,
};
use libm::{expf, floorf, powf, sinf, tanhf};

use crate::engine::{SynthEngine, clamp_unit, valid_note};
use crate::engine_type::EngineType;
use crate::envelope::DecayEnvelope;
use crate::params::{ParameterBank, ParameterId};
use crate::voice::{PolyVoice, VoicePool};

const SILENCE: f32 = 1e-5;
const CHOKE_MS: f32 = 2.0;
const HEADROOM: f32 = 0.6;
const HAT_RATIOS: [f32; 6] = [2.0, 3.0, 4.16, 5.43, 6.79, 8.21];
const CYMBAL_RATIOS: [f32; 6] = [2.0, 2.71, 3.98, 5.12, 6.37, 7.54];
const CLAP_TIMES: [f32; 4] = [0.0, 0.023, 0.047, 0.071];
const CLAP_LEVELS: [f32; 4] = [1.0, 0.85, 0.7, 0.55];
const CLAP_SIGMA: f32 = 0.002;

/// Percussion sounds the kit can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrumSound {
    /// Bass drum.
    #[default]
    Kick,
    /// Rim shot.
    Rim,
    /// Snare drum.
    Snare,
    /// Hand clap.
    Clap,
    /// Closed hi-hat.
    ClosedHat,
    /// Pedal hi-hat.
    PedalHat,
    /// Open hi-hat.
    OpenHat,
    /// Low floor tom.
    TomFloor,
    /// High floor tom.
    TomLow,
    /// Low tom.
    TomLowMid,
    /// Low-mid tom.
    TomMid,
    /// High-mid tom.
    TomHighMid,
    /// High tom.
    TomHigh,
    /// Crash cymbal.
    Crash,
    /// Ride cymbal.
    Ride,
    /// Cowbell.
    Cowbell,
    /// Shaker.
    Shaker,
}

impl DrumSound {
    /// Number of sounds.
    pub const COUNT: usize = 17;

    /// All sounds in pad order.
    pub const ALL: [DrumSound; Self::COUNT] = [
        DrumSound::Kick,
        DrumSound::Rim,
        DrumSound::Snare,
        DrumSound::Clap,
        DrumSound::ClosedHat,
        DrumSound::PedalHat,
        DrumSound::OpenHat,
        DrumSound::TomFloor,
        DrumSound::TomLow,
        DrumSound::TomLowMid,
        DrumSound::TomMid,
        DrumSound::TomHighMid,
        DrumSound::TomHigh,
        DrumSound::Crash,
        DrumSound::Ride,
        DrumSound::Cowbell,
        DrumSound::Shaker,
    ];

    /// General-MIDI style note mapping; unmapped notes play the snare.
    pub fn from_note(note: u8) -> Self {
        match note {
            35 | 36 => DrumSound::Kick,
            37 => DrumSound::Rim,
            38 | 40 => DrumSound::Snare,
            39 => DrumSound::Clap,
            41 => DrumSound::TomFloor,
            42 => DrumSound::ClosedHat,
            43 => DrumSound::TomLow,
            44 => DrumSound::PedalHat,
            45 => DrumSound::TomLowMid,
            46 => DrumSound::OpenHat,
            47 => DrumSound::TomMid,
            48 => DrumSound::TomHighMid,
            49 => DrumSound::Crash,
            50 => DrumSound::TomHigh,
            51 => DrumSound::Ride,
            56 => DrumSound::Cowbell,
            70 => DrumSound::Shaker,
            _ => DrumSound::Snare,
        }
    }

    /// Pad index.
    pub fn index(self) -> usize {
        self as usize
    }

    fn tom_hz(self) -> Option<f32> {
        match self {
            DrumSound::TomFloor => Some(110.0),
            DrumSound::TomLow => Some(130.0),
            DrumSound::TomLowMid => Some(160.0),
            DrumSound::TomMid => Some(190.0),
            DrumSound::TomHighMid => Some(220.0),
            DrumSound::TomHigh => Some(260.0),
            _ => None,
        }
    }

    /// Nominal amplitude decay in ms before pad and Morph scaling.
    fn base_decay_ms(self, nine: bool) -> f32 {
        match self {
            DrumSound::Kick => {
                if nine {
                    380.0
                } else {
                    750.0
                }
            }
            DrumSound::Snare => {
                if nine {
                    550.0
                } else {
                    700.0
                }
            }
            DrumSound::Rim => 90.0,
            DrumSound::Clap => 420.0,
            DrumSound::ClosedHat => 130.0,
            DrumSound::PedalHat => 200.0,
            DrumSound::OpenHat => 900.0,
            DrumSound::Crash => 2200.0,
            DrumSound::Ride => 5200.0,
            DrumSound::Cowbell => 380.0,
            DrumSound::Shaker => 180.0,
            _ => 600.0,
        }
    }

    /// Hard limit on voice length in seconds.
    fn max_seconds(self) -> f32 {
        match self {
            DrumSound::Kick => 1.6,
            DrumSound::Snare => 0.8,
            DrumSound::Rim => 0.2,
            DrumSound::Clap => 1.0,
            DrumSound::ClosedHat => 0.25,
            DrumSound::PedalHat => 0.4,
            DrumSound::OpenHat => 2.4,
            DrumSound::Crash => 5.0,
            DrumSound::Ride => 7.0,
            DrumSound::Cowbell => 0.45,
            DrumSound::Shaker => 0.35,
            _ => 1.2,
        }
    }
}

/// Per-pad settings, all normalized except `tune` (-1 to 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrumPad {
    /// Decay scale, 0 = half, 1 = double.
    pub decay: f32,
    /// Tuning offset in half-octaves.
    pub tune: f32,
    /// Output level.
    pub level: f32,
    /// Stereo position, 0 = left, 1 = right.
    pub pan: f32,
}

impl Default for DrumPad {
    fn default() -> Self {
        Self {
            decay: 0.5,
            tune: 0.0,
            level: 0.85,
            pan: 0.5,
        }
    }
}

/// Settings a voice latches when it is triggered.
#[derive(Debug, Clone, Copy, Default)]
struct Recipe {
    freq: f32,
    fast_hz: f32,
    slow_hz: f32,
    second_ratio: f32,
    gain: f32,
    drive: f32,
}

#[derive(Debug, Clone)]
struct DrumVoice {
    sound: DrumSound,
    active: bool,
    note: u8,
    stamp: u64,
    age: u32,
    max_age: u32,
    sample_rate: f32,
    recipe: Recipe,
    amp: DecayEnvelope,
    tone: DecayEnvelope,
    noise_env: DecayEnvelope,
    click: DecayEnvelope,
    fast: DecayEnvelope,
    slow: DecayEnvelope,
    choke: Option<DecayEnvelope>,
    phases: [f32; 6],
    noise: NoiseGenerator,
    hp: Biquad,
    lp: Biquad,
    click_hp: OnePole,
    level: f32,
    gains: (f32, f32),
}

impl DrumVoice {
    fn new(sample_rate: f32, seed: u32) -> Self {
        let mut click_hp = OnePole::new(sample_rate, 2000.0);
        click_hp.set_mode(OnePoleMode::Highpass);
        Self {
            sound: DrumSound::Kick,
            active: false,
            note: 0,
            stamp: 0,
            age: 0,
            max_age: 0,
            sample_rate,
            recipe: Recipe::default(),
            amp: DecayEnvelope::new(),
            tone: DecayEnvelope::new(),
            noise_env: DecayEnvelope::new(),
            click: DecayEnvelope::new(),
            fast: DecayEnvelope::new(),
            slow: DecayEnvelope::new(),
            choke: None,
            phases: [0.0; 6],
            noise: NoiseGenerator::new(seed),
            hp: Biquad::new(),
            lp: Biquad::new(),
            click_hp,
            level: 0.0,
            gains: (0.0, 0.0),
        }
    }

    fn filters(&mut self, hp_hz: f32, lp_hz: f32) {
        let sr = self.sample_rate;
        self.hp.set(highpass_coefficients(hp_hz, 0.707, sr));
        self.lp.set(lowpass_coefficients(lp_hz, 0.707, sr));
    }

    fn trigger(&mut self, sound: DrumSound, decay_ms: f32, ratio: f32, nine: bool) {
        let sr = self.sample_rate;
        self.sound = sound;
        self.active = true;
        self.age = 0;
        self.max_age = (sound.max_seconds() * sr) as u32;
        self.choke = None;
        self.phases = [0.0; 6];
        self.hp.reset();
        self.lp.reset();
        self.click_hp.reset();
        self.amp.trigger(1.0, decay_ms, sr);
        self.tone.reset();
        self.noise_env.reset();
        self.click.reset();
        self.fast.reset();
        self.slow.reset();

        let pick = |a: f32, b: f32| if nine { b } else { a };
        self.recipe = Recipe {
            freq: 0.0,
            fast_hz: 0.0,
            slow_hz: 0.0,
            second_ratio: 1.0,
            gain: 1.0,
            drive: 1.0,
        };
        match sound {
            DrumSound::Kick => {
                self.recipe.freq = pick(55.0, 65.0) * ratio;
                self.recipe.fast_hz = pick(220.0, 260.0) * ratio;
                self.recipe.slow_hz = pick(40.0, 60.0) * ratio;
                self.fast.trigger(1.0, 8.0, sr);
                self.slow.trigger(1.0, 120.0, sr);
                self.click.trigger(1.0, 3.0, sr);
                self.tone.trigger(1.0, 30.0, sr);
                self.hp.set(highpass_coefficients(40.0, 0.707, sr));
            }
            DrumSound::Snare => {
                self.recipe.freq = pick(186.0, 210.0) * ratio;
                self.recipe.second_ratio = pick(332.0 / 186.0, 380.0 / 210.0);
                self.recipe.drive = pick(1.6, 1.9);
                self.recipe.gain = pick(0.6, 0.9);
                self.tone.trigger(0.35, pick(70.0, 45.0), sr);
                self.noise_env.trigger(1.0, pick(180.0, 150.0), sr);
                self.click.trigger(1.0, 2.0, sr);
                self.filters(pick(700.0, 1200.0), pick(5000.0, 6500.0));
            }
            DrumSound::Rim => {
                self.recipe.freq = 1700.0 * ratio;
                self.recipe.second_ratio = 820.0 / 1700.0;
                self.click.trigger(1.0, 1.0, sr);
                self.filters(500.0, 12000.0);
            }
            DrumSound::Clap => self.filters(650.0, 4500.0),
            DrumSound::ClosedHat | DrumSound::PedalHat | DrumSound::OpenHat => {
                self.recipe.freq = 320.0 * ratio;
                let (noise_ms, gain, hp, lp) = match sound {
                    DrumSound::ClosedHat => (90.0, 1.9, 6000.0, 9000.0),
                    DrumSound::PedalHat => (140.0, 1.5, 5200.0, 9500.0),
                    _ => (650.0, 1.2, 2600.0, 12000.0),
                };
                self.recipe.gain = gain;
                self.noise_env.trigger(1.0, noise_ms, sr);
                self.click.trigger(1.0, 3.0, sr);
                self.tone.trigger(1.0, 1.0, sr);
                self.filters(hp, lp);
            }
            DrumSound::Crash | DrumSound::Ride => {
                self.recipe.freq = 420.0 * ratio;
                self.noise_env.trigger(1.0, decay_ms * 0.5, sr);
                if sound == DrumSound::Crash {
                    self.slow.trigger(1.0, 600.0, sr);
                    self.filters(2600.0, 11000.0);
                } else {
                    self.filters(2200.0, 9000.0);
                }
            }
            DrumSound::Cowbell => {
                self.recipe.freq = 450.0 * ratio;
                self.recipe.second_ratio = 1.48;
                self.click.trigger(1.0, 2.5, sr);
                self.tone.trigger(1.0, 120.0, sr);
                self.filters(600.0, 5500.0);
            }
            DrumSound::Shaker => {
                self.noise_env.trigger(1.0, 140.0, sr);
                self.filters(2000.0, 10000.0);
            }
            tom => {
                let hz = tom.tom_hz().unwrap_or(160.0);
                self.recipe.freq = hz * ratio;
                self.recipe.fast_hz = hz * ratio * 0.5;
                self.recipe.slow_hz = hz * ratio * 0.15;
                self.fast.trigger(1.0, 6.0, sr);
                self.slow.trigger(1.0, 80.0, sr);
                self.click.trigger(1.0, 2.0, sr);
            }
        }
    }

    #[inline]
    fn step_phase(&mut self, i: usize, hz: f32) -> f32 {
        let p = self.phases[i];
        let next = p + hz / self.sample_rate;
        self.phases[i] = next - floorf(next);
        p
    }

    #[inline]
    fn cluster(&mut self, base: f32, ratios: &[f32; 6]) -> f32 {
        let mut sum = 0.0;
        for (i, r) in ratios.iter().enumerate() {
            sum += square(self.step_phase(i, base * r));
        }
        sum / 6.0
    }

    #[inline]
    fn render(&mut self) -> f32 {
        let sr = self.sample_rate;
        let amp = self.amp.advance();
        let r = self.recipe;
        let s = match self.sound {
            DrumSound::Kick => {
                let f = r.freq + r.fast_hz * self.fast.advance() + 0.35 * r.slow_hz * self.slow.advance();
                let p = self.step_phase(0, f);
                let body = sinf(TAU * p) + 0.12 * sinf(2.0 * TAU * p);
                let n = self.noise.next_bipolar();
                let click = self.click_hp.process(n) * self.click.advance();
                let drive = 1.0 + 1.5 * self.tone.advance();
                self.hp.process(tanhf((body * amp + click * 0.5) * drive))
            }
            DrumSound::Snare => {
                let p0 = self.step_phase(0, r.freq);
                let p1 = self.step_phase(1, r.freq * r.second_ratio);
                let tone = (sinf(TAU * p0) + 0.6 * sinf(TAU * p1)) * self.tone.advance();
                let n = self.noise.next_bipolar();
                let body = self.lp.process(self.hp.process(n)) * self.noise_env.advance();
                let crack = n * self.click.advance() * r.gain;
                tanhf((tone + body + crack) * r.drive) * amp
            }
            DrumSound::Rim => {
                let p0 = self.step_phase(0, r.freq);
                let p1 = self.step_phase(1, r.freq * r.second_ratio);
                let n = self.noise.next_bipolar();
                let x = 0.6 * sinf(TAU * p0) + 0.4 * sinf(TAU * p1) + n * self.click.advance();
                self.hp.process(x) * amp
            }
            DrumSound::Clap => {
                let t = self.age as f32 / sr;
                let mut env = 0.0;
                for (ti, a) in CLAP_TIMES.iter().zip(CLAP_LEVELS) {
                    let d = (t - ti) / CLAP_SIGMA;
                    env += a * expf(-0.5 * d * d);
                }
                if t > CLAP_TIMES[3] {
                    env += 0.6 * expf(-(t - CLAP_TIMES[3]) * 18.0);
                }
                let n = self.noise.next_bipolar();
                let x = self.lp.process(self.hp.process(n)) * env;
                tanhf(2.0 * x) * amp
            }
            DrumSound::ClosedHat | DrumSound::PedalHat | DrumSound::OpenHat => {
                let metal = self.cluster(r.freq, &HAT_RATIOS);
                let n = self.noise.next_bipolar();
                let x = metal * 0.5 + n * 0.5 * self.noise_env.advance();
                let bite = n * self.click.advance() * 0.5 + self.tone.advance() * 0.3;
                (self.lp.process(self.hp.process(x)) + bite) * r.gain * amp
            }
            DrumSound::Crash | DrumSound::Ride => {
                if self.sound == DrumSound::Crash && self.age % 32 == 0 {
                    let cutoff = 7000.0 + 4000.0 * self.slow.level();
                    self.lp.set(lowpass_coefficients(cutoff, 0.707, sr));
                }
                self.slow.advance();
                let metal = self.cluster(r.freq, &CYMBAL_RATIOS);
                let n = self.noise.next_bipolar();
                let x = metal * 0.6 + n * 0.4 * self.noise_env.advance();
                self.lp.process(self.hp.process(x)) * amp
            }
            DrumSound::Cowbell => {
                let a = square(self.step_phase(0, r.freq));
                let b = square(self.step_phase(1, r.freq * r.second_ratio));
                let tone = self.lp.process(self.hp.process((a + b) * 0.5));
                let n = self.noise.next_bipolar();
                (tone * (0.6 + 0.4 * self.tone.advance()) + n * self.click.advance() * 0.3) * amp
            }
            DrumSound::Shaker => {
                let n = self.noise.next_bipolar();
                self.lp.process(self.hp.process(n)) * self.noise_env.advance().max(amp * 0.3) * amp
            }
            _ => {
                let f = r.freq + r.fast_hz * self.fast.advance() + r.slow_hz * self.slow.advance();
                let p = self.step_phase(0, f);
                let n = self.noise.next_bipolar();
                let click = self.click_hp.process(n) * self.click.advance() * 0.3;
                tanhf((sinf(TAU * p) + click) * 1.2) * amp
            }
        };

        let mut out = s * self.level;
        if let Some(choke) = self.choke.as_mut() {
            out *= choke.advance();
            if choke.level() < SILENCE {
                self.active = false;
            }
        }
        self.age += 1;
        if self.amp.level() < SILENCE || self.age >= self.max_age {
            self.active = false;
        }
        out
    }
}

impl PolyVoice for DrumVoice {
    fn is_active(&self) -> bool {
        self.active
    }

    fn note(&self) -> u8 {
        self.note
    }

    fn stamp(&self) -> u64 {
        self.stamp
    }

    fn kill(&mut self) {
        self.active = false;
        self.amp.reset();
    }
}

#[inline]
fn square(phase: f32) -> f32 {
    if phase < 0.5 { 1.0 } else { -1.0 }
}

const DEFAULTS: [(ParameterId, f32); 4] = [
    (ParameterId::Harmonics, 0.5),
    (ParameterId::Timbre, 0.25),
    (ParameterId::Morph, 3.0 / 7.0),
    (ParameterId::Volume, 0.8),
];

/// Sixteen-voice synthesized drum kit.
pub struct DrumKitEngine {
    pool: VoicePool<DrumVoice>,
    params: ParameterBank,
    pads: [DrumPad; DrumSound::COUNT],
    sample_rate: f32,
}

impl DrumKitEngine {
    /// New kit with default pads.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            pool: VoicePool::new(|i| DrumVoice::new(sample_rate, 0x9E37_79B9 ^ (i as u32 + 1))),
            params: ParameterBank::new(&DEFAULTS),
            pads: [DrumPad::default(); DrumSound::COUNT],
            sample_rate,
        }
    }

    /// Pad settings for `sound`.
    pub fn pad(&self, sound: DrumSound) -> DrumPad {
        self.pads[sound.index()]
    }

    /// Replace pad settings; fields are clamped to their ranges.
    pub fn set_pad(&mut self, sound: DrumSound, pad: DrumPad) {
        let clean = |v: f32, lo: f32, hi: f32, default: f32| {
            if v.is_finite() { v.clamp(lo, hi) } else { default }
        };
        let d = DrumPad::default();
        self.pads[sound.index()] = DrumPad {
            decay: clean(pad.decay, 0.0, 1.0, d.decay),
            tune: clean(pad.tune, -1.0, 1.0, d.tune),
            level: clean(pad.level, 0.0, 1.0, d.level),
            pan: clean(pad.pan, 0.0, 1.0, d.pan),
        };
    }

    /// Trigger a sound directly.
    pub fn trigger(&mut self, sound: DrumSound, velocity: f32) {
        self.hit(sound, 0, velocity);
    }

    /// Sounds of the voices currently playing.
    pub fn active_sounds(&self) -> impl Iterator<Item = DrumSound> + '_ {
        self.pool.voices().iter().filter(|v| v.active).map(|v| v.sound)
    }

    fn hit(&mut self, sound: DrumSound, note: u8, velocity: f32) {
        if matches!(sound, DrumSound::ClosedHat | DrumSound::PedalHat) {
            let sr = self.sample_rate;
            for voice in self.pool.voices_mut() {
                if voice.active && voice.sound == DrumSound::OpenHat && voice.choke.is_none() {
                    let mut fade = DecayEnvelope::new();
                    fade.trigger(1.0, CHOKE_MS, sr);
                    voice.choke = Some(fade);
                }
            }
        }

        let pad = self.pads[sound.index()];
        let nine = self.params.get(ParameterId::Timbre) >= 0.5;
        let morph = self.params.get(ParameterId::Morph);
        let decay = sound.base_decay_ms(nine) * (0.5 + pad.decay * 1.5) * (0.25 + 1.75 * morph);
        let tune = (self.params.get(ParameterId::Harmonics) - 0.5) * 2.0 + pad.tune;
        let ratio = powf(2.0, tune * 0.5);

        let index = self.pool.claim().index();
        let stamp = self.pool.next_stamp();
        let voice = &mut self.pool.voices_mut()[index];
        voice.trigger(sound, decay, ratio, nine);
        voice.note = note;
        voice.stamp = stamp;
        voice.level = clamp_unit(velocity) * pad.level;
        voice.gains = equal_power_pan(pad.pan * 2.0 - 1.0);
    }
}

impl SynthEngine for DrumKitEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::DrumKit
    }

    fn description(&self) -> &'static str {
        "Analog-style drum voices with 808 and 909 recipes"
    }

    fn note_on(&mut self, note: u8, velocity: f32, _aftertouch: f32) {
        if !valid_note(note) {
            return;
        }
        self.hit(DrumSound::from_note(note), note, velocity);
    }

    /// Drum hits are one-shots; note-off has no effect.
    fn note_off(&mut self, _note: u8) {}

    fn all_notes_off(&mut self) {
        self.pool.kill_all();
    }

    fn set_parameter(&mut self, id: ParameterId, value: f32) {
        self.params.set(id, value);
    }

    fn get_parameter(&self, id: ParameterId) -> f32 {
        self.params.get(id)
    }

    fn has_parameter(&self, id: ParameterId) -> bool {
        self.params.supports(id)
    }

    fn process(&mut self, output: &mut [AudioFrame]) {
        let volume = self.params.get(ParameterId::Volume);
        for frame in output.iter_mut() {
            let mut mix = AudioFrame::SILENCE;
            for voice in self.pool.voices_mut() {
                if voice.active {
                    let s = voice.render();
                    mix += AudioFrame::new(s * voice.gains.0, s * voice.gains.1);
                }
            }
            *frame = mix.map(|x| tanhf(x * HEADROOM * 1.1) * volume);
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
        for (i, voice) in self.pool.all_voices_mut().iter_mut().enumerate() {
            *voice = DrumVoice::new(sample_rate, 0x9E37_79B9 ^ (i as u32 + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(kit: &mut DrumKitEngine, frames: usize) -> f32 {
        let mut buf = [AudioFrame::SILENCE; 128];
        let mut peak = 0.0f32;
        let mut left = frames;
        while left > 0 {
            let n = left.min(128);
            kit.process(&mut buf[..n]);
            for f in &buf[..n] {
                assert!(f.is_finite());
                peak = peak.max(f.peak());
            }
            left -= n;
        }
        peak
    }

    #[test]
    fn test_note_map() {
        assert_eq!(DrumSound::from_note(36), DrumSound::Kick);
        assert_eq!(DrumSound::from_note(42), DrumSound::ClosedHat);
        assert_eq!(DrumSound::from_note(46), DrumSound::OpenHat);
        assert_eq!(DrumSound::from_note(56), DrumSound::Cowbell);
        assert_eq!(DrumSound::from_note(100), DrumSound::Snare);
    }

    #[test]
    fn test_every_sound_renders_and_ends() {
        for sound in DrumSound::ALL {
            let mut kit = DrumKitEngine::new(48000.0);
            kit.trigger(sound, 1.0);
            let peak = render(&mut kit, 4800);
            assert!(peak > 1e-3, "{sound:?} silent");
            render(&mut kit, (sound.max_seconds() * 48000.0) as usize);
            assert_eq!(kit.active_voice_count(), 0, "{sound:?} outlived its max length");
        }
    }

    #[test]
    fn test_closed_hat_chokes_open() {
        let mut kit = DrumKitEngine::new(48000.0);
        kit.note_on(46, 1.0, 0.0);
        render(&mut kit, 256);
        kit.note_on(42, 1.0, 0.0);
        render(&mut kit, 48 * 40);
        assert!(kit.active_sounds().all(|s| s != DrumSound::OpenHat));
    }

    #[test]
    fn test_steals_oldest_hit() {
        let mut kit = DrumKitEngine::new(48000.0);
        kit.trigger(DrumSound::Ride, 1.0);
        for _ in 0..15 {
            kit.trigger(DrumSound::Crash, 1.0);
        }
        assert_eq!(kit.active_voice_count(), 16);
        kit.trigger(DrumSound::Cowbell, 1.0);
        assert_eq!(kit.active_voice_count(), 16);
        assert!(kit.active_sounds().all(|s| s != DrumSound::Ride));
    }

    #[test]
    fn test_decay_scale_from_morph() {
        let mut short = DrumKitEngine::new(48000.0);
        short.set_parameter(ParameterId::Morph, 0.0);
        short.trigger(DrumSound::Crash, 1.0);
        let mut long = DrumKitEngine::new(48000.0);
        long.set_parameter(ParameterId::Morph, 1.0);
        long.trigger(DrumSound::Crash, 1.0);
        render(&mut short, 48000);
        render(&mut long, 48000);
        let a = short.pool.voices()[0].amp.level();
        let b = long.pool.voices()[0].amp.level();
        assert!(b > a, "longer decay should leave more level: {a} vs {b}");
    }

    #[test]
    fn test_pad_clamped() {
        let mut kit = DrumKitEngine::new(48000.0);
        kit.set_pad(
            DrumSound::Kick,
            DrumPad {
                decay: 4.0,
                tune: f32::NAN,
                level: -1.0,
                pan: 0.2,
            },
        );
        let pad = kit.pad(DrumSound::Kick);
        assert_eq!(pad.decay, 1.0);
        assert_eq!(pad.tune, 0.0);
        assert_eq!(pad.level, 0.0);
    }
}
