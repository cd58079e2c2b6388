//! Per-slot post-processing chain.
//!
//! Signal flow: pre-gain → tanh drive → equal-power pan → one-pole
//! high-pass → biquad low-pass. The user baseline is kept apart from the
//! effective values that LFO modulation moves each block.

use ether_core::{
    AudioFrame, Biquad, OnePole, OnePoleMode, clamp_finite, equal_power_pan, lowpass_coefficients,
};
use ether_synth::{PARAM_COUNT, ParameterId};
use libm::{exp2f, tanhf};

/// Cutoff in Hz for a normalized value: 100·2^(7.5v).
#[inline]
pub fn cutoff_hz(value: f32) -> f32 {
    100.0 * exp2f(7.5 * value.clamp(0.0, 1.0))
}

/// High-pass corner in Hz for a normalized value: 20 + 180v.
#[inline]
pub fn hpf_hz(value: f32) -> f32 {
    20.0 + 180.0 * value.clamp(0.0, 1.0)
}

/// Low-pass Q for a normalized value: 0.5 + 9.5v.
#[inline]
pub fn resonance_q(value: f32) -> f32 {
    0.5 + 9.5 * value.clamp(0.0, 1.0)
}

const MIN_Q: f32 = 0.5;
const MAX_Q: f32 = 10.0;

/// Where a parameter write lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Post chain only.
    Post,
    /// Post chain, then forwarded to the engine.
    PostAndEngine,
    /// Engine only.
    Engine,
}

impl Routing {
    /// Routing for a parameter id.
    pub fn of(id: ParameterId) -> Self {
        match id {
            ParameterId::Hpf
            | ParameterId::Volume
            | ParameterId::Amplitude
            | ParameterId::Pan
            | ParameterId::Clip => Self::Post,
            ParameterId::FilterCutoff | ParameterId::FilterResonance => Self::PostAndEngine,
            _ => Self::Engine,
        }
    }

    /// Whether the engine sees the write.
    pub fn reaches_engine(self) -> bool {
        !matches!(self, Self::Post)
    }
}

/// Post-chain settings in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostValues {
    /// High-pass corner, Hz.
    pub hpf_hz: f32,
    /// Low-pass cutoff, Hz.
    pub cutoff_hz: f32,
    /// Low-pass Q.
    pub q: f32,
    /// Linear gain before the drive stage.
    pub pre_gain: f32,
    /// Drive amount, 0 to 1.
    pub drive: f32,
    /// Stereo position, -1 to 1.
    pub pan: f32,
}

impl Default for PostValues {
    fn default() -> Self {
        Self {
            hpf_hz: hpf_hz(0.0),
            cutoff_hz: cutoff_hz(1.0),
            q: resonance_q(0.0),
            pre_gain: 1.0,
            drive: 0.0,
            pan: 0.0,
        }
    }
}

impl PostValues {
    /// Apply a normalized parameter write. Returns false for ids the chain
    /// does not own.
    pub fn set_normalized(&mut self, id: ParameterId, value: f32) -> bool {
        let v = value.clamp(0.0, 1.0);
        match id {
            ParameterId::Hpf => self.hpf_hz = hpf_hz(v),
            ParameterId::FilterCutoff => self.cutoff_hz = cutoff_hz(v),
            ParameterId::FilterResonance => self.q = resonance_q(v),
            ParameterId::Volume | ParameterId::Amplitude => self.pre_gain = 2.0 * v,
            ParameterId::Pan => self.pan = 2.0 * v - 1.0,
            ParameterId::Clip => self.drive = v,
            _ => return false,
        }
        true
    }

    /// Baseline moved by per-parameter modulation sums.
    ///
    /// Zero modulation returns the baseline unchanged.
    pub fn modulated(&self, modulation: &[f32; PARAM_COUNT]) -> Self {
        let m = |id: ParameterId| modulation[id.index()];
        let cutoff = m(ParameterId::FilterCutoff);
        let q = m(ParameterId::FilterResonance);
        let gain = m(ParameterId::Volume) + m(ParameterId::Amplitude);
        let drive = m(ParameterId::Clip);
        let pan = m(ParameterId::Pan);

        let mut out = *self;
        if cutoff != 0.0 {
            out.cutoff_hz = self.cutoff_hz * exp2f(cutoff.clamp(-1.0, 1.0));
        }
        if q != 0.0 {
            out.q = (self.q + 2.0 * q).clamp(MIN_Q, MAX_Q);
        }
        if gain != 0.0 {
            out.pre_gain = (self.pre_gain * (1.0 + 0.5 * gain)).max(0.0);
        }
        if drive != 0.0 {
            out.drive = (self.drive + 0.5 * drive).clamp(0.0, 1.0);
        }
        if pan != 0.0 {
            out.pan = (self.pan + 0.5 * pan).clamp(-1.0, 1.0);
        }
        out
    }
}

/// Stereo post chain with its filter state.
#[derive(Debug, Clone)]
pub struct PostChain {
    sample_rate: f32,
    baseline: PostValues,
    effective: PostValues,
    hpf: [OnePole; 2],
    lpf: [Biquad; 2],
    lpf_settings: (f32, f32),
}

impl PostChain {
    /// Chain with the open defaults.
    pub fn new(sample_rate: f32) -> Self {
        let baseline = PostValues::default();
        let hpf = core::array::from_fn(|_| {
            let mut f = OnePole::new(sample_rate, baseline.hpf_hz);
            f.set_mode(OnePoleMode::Highpass);
            f
        });
        let mut chain = Self {
            sample_rate,
            baseline,
            effective: baseline,
            hpf,
            lpf: [Biquad::new(), Biquad::new()],
            lpf_settings: (0.0, 0.0),
        };
        chain.update_filters();
        chain
    }

    /// The user baseline.
    pub fn baseline(&self) -> &PostValues {
        &self.baseline
    }

    /// Values used for the current block.
    pub fn effective(&self) -> &PostValues {
        &self.effective
    }

    /// Write a normalized parameter into the baseline.
    pub fn set_parameter(&mut self, id: ParameterId, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        let handled = self.baseline.set_normalized(id, value);
        if handled {
            self.effective = self.baseline;
            self.update_filters();
        }
        handled
    }

    /// Recompute effective values from the baseline and this block's modulation.
    pub fn apply_modulation(&mut self, modulation: &[f32; PARAM_COUNT]) {
        self.effective = self.baseline.modulated(modulation);
        self.update_filters();
    }

    fn update_filters(&mut self) {
        for f in &mut self.hpf {
            f.set_frequency(self.effective.hpf_hz);
        }
        let cutoff = self.effective.cutoff_hz.clamp(20.0, 0.45 * self.sample_rate);
        let q = self.effective.q.clamp(MIN_Q, MAX_Q);
        if (cutoff, q) != self.lpf_settings {
            let coeffs = lowpass_coefficients(cutoff, q, self.sample_rate);
            for f in &mut self.lpf {
                f.set(coeffs);
            }
            self.lpf_settings = (cutoff, q);
        }
    }

    /// Process a block in place.
    pub fn process(&mut self, buffer: &mut [AudioFrame]) {
        let PostValues {
            pre_gain,
            drive,
            pan,
            ..
        } = self.effective;
        let drive_gain = 1.0 + 5.0 * drive;
        let (pan_l, pan_r) = equal_power_pan(pan);
        let [hp_l, hp_r] = &mut self.hpf;
        let [lp_l, lp_r] = &mut self.lpf;

        for frame in buffer.iter_mut() {
            let l = tanhf(drive_gain * frame.left * pre_gain) * pan_l;
            let r = tanhf(drive_gain * frame.right * pre_gain) * pan_r;
            let l = lp_l.process(hp_l.process(l));
            let r = lp_r.process(hp_r.process(r));
            *frame = AudioFrame::new(clamp_finite(l), clamp_finite(r));
        }
    }

    /// Clear filter state.
    pub fn reset(&mut self) {
        for f in &mut self.hpf {
            f.reset();
        }
        for f in &mut self.lpf {
            f.reset();
        }
    }
}
