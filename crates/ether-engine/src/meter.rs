//! Output metering and callback load.

use std::time::Duration;

use ether_core::AudioFrame;

/// Smoothed DSP load as a percentage of the block's real-time budget.
///
/// `usage = elapsed / block_duration × 100`, folded into an exponential
/// moving average (0.85 old, 0.15 new) and clamped to 0..=400.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuMeter {
    usage: f32,
}

impl CpuMeter {
    /// Upper bound of the reading.
    pub const MAX: f32 = 400.0;

    /// Fold in one block's timing.
    pub fn update(&mut self, elapsed: Duration, frames: usize, sample_rate: f32) -> f32 {
        if frames == 0 || sample_rate <= 0.0 {
            return self.usage;
        }
        let budget = frames as f32 / sample_rate;
        let instant = elapsed.as_secs_f32() / budget * 100.0;
        self.usage = (0.85 * self.usage + 0.15 * instant).clamp(0.0, Self::MAX);
        self.usage
    }

    /// Current reading.
    pub fn usage(&self) -> f32 {
        self.usage
    }
}

/// Peak and RMS of a block, over both channels.
pub fn measure(buffer: &[AudioFrame]) -> (f32, f32) {
    if buffer.is_empty() {
        return (0.0, 0.0);
    }
    let mut peak = 0.0f32;
    let mut sum_sq = 0.0f32;
    for frame in buffer {
        peak = peak.max(frame.peak());
        sum_sq += frame.left * frame.left + frame.right * frame.right;
    }
    (peak, (sum_sq / (2 * buffer.len()) as f32).sqrt())
}
