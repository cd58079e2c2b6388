//! Stereo audio frame.

use core::ops::{Add, AddAssign, Mul};

/// A stereo (left, right) sample pair.
///
/// Every DSP stage after the synthesis voices exchanges blocks of frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample.
    pub left: f32,
    /// Right channel sample.
    pub right: f32,
}

impl AudioFrame {
    /// Silent frame.
    pub const SILENCE: AudioFrame = AudioFrame {
        left: 0.0,
        right: 0.0,
    };

    /// Create a frame from both channels.
    #[inline]
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Same sample on both channels.
    #[inline]
    pub const fn mono(sample: f32) -> Self {
        Self {
            left: sample,
            right: sample,
        }
    }

    /// Larger absolute value of the two channels.
    #[inline]
    pub fn peak(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }

    /// Whether both channels are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.right.is_finite()
    }

    /// Apply `f` to each channel.
    #[inline]
    pub fn map(self, mut f: impl FnMut(f32) -> f32) -> Self {
        Self {
            left: f(self.left),
            right: f(self.right),
        }
    }
}

impl Add for AudioFrame {
    type Output = AudioFrame;

    #[inline]
    fn add(self, rhs: AudioFrame) -> AudioFrame {
        AudioFrame::new(self.left + rhs.left, self.right + rhs.right)
    }
}

impl AddAssign for AudioFrame {
    #[inline]
    fn add_assign(&mut self, rhs: AudioFrame) {
        self.left += rhs.left;
        self.right += rhs.right;
    }
}

impl Mul<f32> for AudioFrame {
    type Output = AudioFrame;

    #[inline]
    fn mul(self, gain: f32) -> AudioFrame {
        AudioFrame::new(self.left * gain, self.right * gain)
    }
}
