//! Ether Core - DSP primitives for the ether synthesizer
//!
//! The leaves of the dependency graph: everything here is allocation-free,
//! `no_std` compatible, and safe to call once per sample on the audio thread.
//!
//! # Filters
//!
//! - [`Biquad`] - Second-order IIR with RBJ cookbook coefficients
//! - [`StateVariableFilter`] - TPT state variable filter (LP/HP/BP/notch)
//! - [`OnePole`] - 6 dB/oct low-pass and high-pass
//!
//! # Modulation
//!
//! - [`Lfo`] - Low-frequency oscillator with block-rate advance and sync modes
//! - [`SmoothedParam`] - One-pole parameter smoothing
//!
//! # Sources and frames
//!
//! - [`NoiseGenerator`] - Deterministic xorshift white noise
//! - [`AudioFrame`] - Stereo sample pair, the unit exchanged between stages
//!
//! # no_std Support
//!
//! Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! ether-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod biquad;
pub mod frame;
pub mod lfo;
pub mod math;
pub mod noise;
pub mod one_pole;
pub mod param;
pub mod svf;

pub use biquad::{Biquad, bandpass_coefficients, highpass_coefficients, lowpass_coefficients};
pub use frame::AudioFrame;
pub use lfo::{Lfo, LfoSync, LfoWaveform};
pub use math::{
    clamp_finite, db_to_linear, equal_power_pan, exp_decay_multiplier, flush_denormal, lerp,
    linear_to_db, midi_to_freq, ms_to_samples, semitones_to_ratio, soft_clip,
};
pub use noise::NoiseGenerator;
pub use one_pole::{OnePole, OnePoleMode};
pub use param::SmoothedParam;
pub use svf::{StateVariableFilter, SvfOutput};
