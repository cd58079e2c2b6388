//! Band-limited single-cycle wavetable bank.
//!
//! Eight tables, each stored at [`MIP_LEVELS`] harmonic limits so that high
//! notes read a version with fewer partials. The bank is immutable once
//! built; with `std` it is built once per process and shared.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::f32::consts::TAU;
use libm::{floorf, sinf};

/// Samples per single-cycle table.
pub const TABLE_SIZE: usize = 256;

/// Number of distinct tables in the bank.
pub const TABLE_COUNT: usize = 8;

/// Band-limited copies per table; level `m` keeps at most `64 >> m` partials.
pub const MIP_LEVELS: usize = 7;

const MAX_HARMONICS: usize = 64;

/// Immutable bank of `TABLE_COUNT × MIP_LEVELS × TABLE_SIZE` samples.
#[derive(Debug)]
pub struct WavetableBank {
    data: Vec<f32>,
}

impl WavetableBank {
    /// Build every table additively.
    pub fn build() -> Self {
        let mut data = vec![0.0; TABLE_COUNT * MIP_LEVELS * TABLE_SIZE];
        for table in 0..TABLE_COUNT {
            for level in 0..MIP_LEVELS {
                let cap = MAX_HARMONICS >> level;
                let start = (table * MIP_LEVELS + level) * TABLE_SIZE;
                let cycle = &mut data[start..start + TABLE_SIZE];
                for h in 1..=cap {
                    let amp = harmonic_amplitude(table, h);
                    if amp == 0.0 {
                        continue;
                    }
                    for (i, s) in cycle.iter_mut().enumerate() {
                        *s += amp * sinf(TAU * h as f32 * i as f32 / TABLE_SIZE as f32);
                    }
                }
                let peak = cycle.iter().fold(0.0f32, |m, s| m.max(s.abs()));
                if peak > 0.0 {
                    for s in cycle.iter_mut() {
                        *s /= peak;
                    }
                }
            }
        }
        Self { data }
    }

    /// Process-wide shared bank.
    #[cfg(feature = "std")]
    pub fn shared() -> Arc<Self> {
        static BANK: std::sync::OnceLock<Arc<WavetableBank>> = std::sync::OnceLock::new();
        Arc::clone(BANK.get_or_init(|| Arc::new(WavetableBank::build())))
    }

    /// Freshly built bank (no process-wide cache without `std`).
    #[cfg(not(feature = "std"))]
    pub fn shared() -> Arc<Self> {
        Arc::new(WavetableBank::build())
    }

    /// Mip level safe for `freq_hz` at `sample_rate`.
    pub fn level_for(freq_hz: f32, sample_rate: f32) -> usize {
        let allowed = if freq_hz > 0.0 {
            sample_rate * 0.5 / freq_hz
        } else {
            MAX_HARMONICS as f32
        };
        (0..MIP_LEVELS)
            .find(|&m| (MAX_HARMONICS >> m) as f32 <= allowed)
            .unwrap_or(MIP_LEVELS - 1)
    }

    /// Linearly interpolated sample of `table` at `phase` in [0, 1).
    #[inline]
    pub fn read(&self, table: usize, level: usize, phase: f32) -> f32 {
        let table = table % TABLE_COUNT;
        let level = level.min(MIP_LEVELS - 1);
        let start = (table * MIP_LEVELS + level) * TABLE_SIZE;
        let pos = (phase - floorf(phase)) * TABLE_SIZE as f32;
        let i0 = (pos as usize) % TABLE_SIZE;
        let i1 = (i0 + 1) % TABLE_SIZE;
        let frac = pos - floorf(pos);
        let a = self.data[start + i0];
        let b = self.data[start + i1];
        a + (b - a) * frac
    }

    /// Read at a fractional scan position, crossfading neighbouring tables.
    #[inline]
    pub fn read_scanned(&self, scan: f32, level: usize, phase: f32) -> f32 {
        let scan = scan - floorf(scan / TABLE_COUNT as f32) * TABLE_COUNT as f32;
        let t0 = scan as usize % TABLE_COUNT;
        let frac = scan - floorf(scan);
        let a = self.read(t0, level, phase);
        if frac <= 0.0 {
            return a;
        }
        let b = self.read(t0 + 1, level, phase);
        a + (b - a) * frac
    }
}

/// Partial amplitudes: sine, triangle, saw, square, 25% pulse, organ,
/// bright-odd, vocal-ish.
fn harmonic_amplitude(table: usize, h: usize) -> f32 {
    let hf = h as f32;
    match table {
        0 => {
            if h == 1 {
                1.0
            } else {
                0.0
            }
        }
        1 => {
            if h % 2 == 1 {
                let sign = if (h / 2) % 2 == 0 { 1.0 } else { -1.0 };
                sign / (hf * hf)
            } else {
                0.0
            }
        }
        2 => 1.0 / hf,
        3 => {
            if h % 2 == 1 {
                1.0 / hf
            } else {
                0.0
            }
        }
        4 => sinf(core::f32::consts::PI * hf * 0.25) / hf,
        5 => match h {
            1 => 1.0,
            2 => 0.6,
            3 => 0.5,
            4 => 0.35,
            6 => 0.25,
            8 => 0.2,
            _ => 0.0,
        },
        6 => {
            if h % 2 == 1 {
                1.0 / libm::sqrtf(hf)
            } else {
                0.0
            }
        }
        _ => {
            // two resonant bumps around the 3rd and 9th partials
            let f1 = libm::expf(-((hf - 3.0) * (hf - 3.0)) / 4.0);
            let f2 = 0.5 * libm::expf(-((hf - 9.0) * (hf - 9.0)) / 8.0);
            (f1 + f2 + 0.05) / hf
        }
    }
}
