//! Shared send effects: a stereo feedback delay and a four-comb reverb.
//!
//! Both take normalized settings and return only the wet signal; the dry
//! mix already sits on the master bus.

use ether_core::{AudioFrame, SmoothedParam, flush_denormal};
use libm::powf;

/// Longest delay the line can hold.
pub const MAX_DELAY_SECONDS: f32 = 2.0;

/// Comb lengths at 48 kHz.
pub const REVERB_TAPS: [usize; 4] = [149, 263, 457, 631];

const RIGHT_SPREAD: usize = 23;
const REFERENCE_RATE: f32 = 48000.0;

/// Delay time in ms for a normalized value: 40 + 960v.
#[inline]
pub fn delay_time_ms(value: f32) -> f32 {
    40.0 + 960.0 * value.clamp(0.0, 1.0)
}

/// Reverb decay time in seconds for a normalized size: 0.2 + 0.8v.
#[inline]
pub fn reverb_time_seconds(value: f32) -> f32 {
    0.2 + 0.8 * value.clamp(0.0, 1.0)
}

/// Stereo feedback delay with a 2-second line.
#[derive(Debug, Clone)]
pub struct SendDelay {
    line: Vec<AudioFrame>,
    write: usize,
    sample_rate: f32,
    time_samples: SmoothedParam,
    feedback: f32,
    mix: f32,
}

impl SendDelay {
    /// Delay at the default settings.
    pub fn new(sample_rate: f32) -> Self {
        let len = (MAX_DELAY_SECONDS * sample_rate) as usize + 1;
        let mut delay = Self {
            line: vec![AudioFrame::SILENCE; len.max(2)],
            write: 0,
            sample_rate,
            time_samples: SmoothedParam::with_config(1.0, sample_rate, 50.0),
            feedback: 0.0,
            mix: 0.0,
        };
        delay.set(0.3, 0.4, 0.3);
        delay.settle();
        delay
    }

    /// Jump the delay time to its target without gliding.
    pub fn settle(&mut self) {
        self.time_samples.set_immediate(self.time_samples.target());
    }

    /// Normalized time, feedback and mix.
    pub fn set(&mut self, time: f32, feedback: f32, mix: f32) {
        if time.is_finite() {
            let max = (self.line.len() - 1) as f32;
            let samples = delay_time_ms(time) * self.sample_rate / 1000.0;
            self.time_samples.set_target(samples.clamp(1.0, max));
        }
        if feedback.is_finite() {
            self.feedback = 0.9 * feedback.clamp(0.0, 1.0);
        }
        if mix.is_finite() {
            self.mix = 0.5 * mix.clamp(0.0, 1.0);
        }
    }

    /// Current delay time in ms.
    pub fn time_ms(&self) -> f32 {
        self.time_samples.target() * 1000.0 / self.sample_rate
    }

    /// Feedback gain.
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Wet level.
    pub fn mix(&self) -> f32 {
        self.mix
    }

    #[inline]
    fn read(&self, delay: f32) -> AudioFrame {
        let len = self.line.len();
        let whole = delay as usize;
        let frac = delay - whole as f32;
        let a = self.line[(self.write + len - whole) % len];
        let b = self.line[(self.write + len - whole - 1) % len];
        a * (1.0 - frac) + b * frac
    }

    /// Feed `send` in and add the wet signal to `out`.
    pub fn process(&mut self, send: &[AudioFrame], out: &mut [AudioFrame]) {
        let len = self.line.len();
        for (input, output) in send.iter().zip(out.iter_mut()) {
            let delay = self.time_samples.advance();
            let delayed = self.read(delay);
            *output += delayed * self.mix;
            let fed = *input + delayed * self.feedback;
            self.line[self.write] = fed.map(flush_denormal);
            self.write = (self.write + 1) % len;
        }
    }

    /// Clear the line.
    pub fn reset(&mut self) {
        self.line.fill(AudioFrame::SILENCE);
        self.write = 0;
    }
}

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    store: f32,
    feedback: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            index: 0,
            store: 0.0,
            feedback: 0.5,
        }
    }

    /// Feedback for a decay time: -60 dB after `seconds`.
    fn tune(&mut self, seconds: f32, sample_rate: f32) {
        let g = powf(10.0, -3.0 * self.buffer.len() as f32 / (seconds * sample_rate));
        self.feedback = g.clamp(0.1, 0.98);
    }

    #[inline]
    fn process(&mut self, input: f32, damp: f32) -> f32 {
        let out = self.buffer[self.index];
        self.store = flush_denormal(out * (1.0 - damp) + self.store * damp);
        self.buffer[self.index] = input + self.store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.store = 0.0;
    }
}

/// Four parallel damped combs per channel.
#[derive(Debug, Clone)]
pub struct SendReverb {
    left: [Comb; 4],
    right: [Comb; 4],
    sample_rate: f32,
    damp: f32,
    mix: f32,
}

impl SendReverb {
    /// Reverb at the default settings.
    pub fn new(sample_rate: f32) -> Self {
        let scale = sample_rate / REFERENCE_RATE;
        let comb = |len: usize| Comb::new((len as f32 * scale) as usize);
        let mut reverb = Self {
            left: REVERB_TAPS.map(comb),
            right: REVERB_TAPS.map(|len| comb(len + RIGHT_SPREAD)),
            sample_rate,
            damp: 0.0,
            mix: 0.0,
        };
        reverb.set(0.5, 0.5, 0.3);
        reverb
    }

    /// Normalized size, damping and mix.
    pub fn set(&mut self, size: f32, damping: f32, mix: f32) {
        if size.is_finite() {
            let seconds = reverb_time_seconds(size);
            for comb in self.left.iter_mut().chain(self.right.iter_mut()) {
                comb.tune(seconds, self.sample_rate);
            }
        }
        if damping.is_finite() {
            self.damp = 0.9 * damping.clamp(0.0, 1.0);
        }
        if mix.is_finite() {
            self.mix = 0.5 * mix.clamp(0.0, 1.0);
        }
    }

    /// Comb feedback gains, left channel.
    pub fn feedbacks(&self) -> [f32; 4] {
        core::array::from_fn(|i| self.left[i].feedback)
    }

    /// Wet level.
    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Feed `send` in and add the wet signal to `out`.
    pub fn process(&mut self, send: &[AudioFrame], out: &mut [AudioFrame]) {
        let damp = self.damp;
        for (input, output) in send.iter().zip(out.iter_mut()) {
            let mut l = 0.0;
            let mut r = 0.0;
            for comb in &mut self.left {
                l += comb.process(input.left, damp);
            }
            for comb in &mut self.right {
                r += comb.process(input.right, damp);
            }
            *output += AudioFrame::new(l, r) * (0.25 * self.mix);
        }
    }

    /// Clear all combs.
    pub fn reset(&mut self) {
        for comb in self.left.iter_mut().chain(self.right.iter_mut()) {
            comb.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn impulse(len: usize) -> Vec<AudioFrame> {
        let mut buf = vec![AudioFrame::SILENCE; len];
        buf[0] = AudioFrame::mono(1.0);
        buf
    }

    #[test]
    fn test_delay_mappings() {
        let mut delay = SendDelay::new(SR);
        delay.set(1.0, 1.0, 1.0);
        assert!((delay.time_ms() - 1000.0).abs() < 0.1);
        assert!((delay.feedback() - 0.9).abs() < 1e-6);
        assert!((delay.mix() - 0.5).abs() < 1e-6);
        delay.set(0.0, 0.0, 0.0);
        assert!((delay.time_ms() - 40.0).abs() < 0.1);
    }

    #[test]
    fn test_delay_echo_arrives_on_time() {
        let mut delay = SendDelay::new(SR);
        delay.set(0.0, 0.0, 1.0);
        delay.settle();
        let send = impulse(4800);
        let mut out = vec![AudioFrame::SILENCE; 4800];
        delay.process(&send, &mut out);
        let echo = 1920;
        assert!((out[echo].left - 0.5).abs() < 1e-3, "echo at {echo}: {:?}", out[echo]);
        assert!(out[..echo].iter().all(|f| f.peak() < 1e-6));
    }

    #[test]
    fn test_reverb_feedback_clamped() {
        let mut reverb = SendReverb::new(SR);
        reverb.set(1.0, 0.0, 1.0);
        assert!(reverb.feedbacks().iter().all(|&g| (0.1..=0.98).contains(&g)));
        reverb.set(0.0, 0.0, 1.0);
        let short = reverb.feedbacks();
        assert!(short.iter().all(|&g| g >= 0.1));
    }

    #[test]
    fn test_reverb_tail_decays() {
        let mut reverb = SendReverb::new(SR);
        reverb.set(0.0, 0.5, 1.0);
        let send = impulse(48000);
        let mut out = vec![AudioFrame::SILENCE; 48000];
        reverb.process(&send, &mut out);
        let early = out[..4800].iter().map(|f| f.peak()).fold(0.0f32, f32::max);
        let late = out[43200..].iter().map(|f| f.peak()).fold(0.0f32, f32::max);
        assert!(early > 0.0);
        assert!(late < early * 0.01);
        assert!(out.iter().all(|f| f.is_finite()));
    }
}
