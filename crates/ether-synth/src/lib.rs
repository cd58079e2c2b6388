//! Ether Synth - Synthesis engines for the ether synthesizer
//!
//! Everything an instrument slot needs to turn notes into audio: the
//! [`SynthEngine`] contract, the closed [`EngineType`] catalog, normalized
//! [`ParameterId`]s, and six built-in engines.
//!
//! # Building Blocks
//!
//! - [`Oscillator`] - PolyBLEP band-limited oscillator
//! - [`AdsrEnvelope`] / [`DecayEnvelope`] - Gated and one-shot envelopes
//! - [`VoicePool`] - Fixed-capacity voice allocation with oldest-voice stealing
//! - [`VectorPath`] - Closed Catmull-Rom path over the four-corner plane
//! - [`PathLatch`] - Free or tempo-locked playback along a path
//! - [`WavetableBank`] - Mip-mapped single-cycle tables, shared between engines
//!
//! ```rust
//! use ether_synth::{AdsrEnvelope, EnvelopeStage};
//!
//! let mut env = AdsrEnvelope::new(48000.0);
//! env.set_attack_ms(10.0);
//! env.set_release_ms(200.0);
//! env.gate_on();
//! env.advance();
//! assert_eq!(env.stage(), EnvelopeStage::Attack);
//! ```
//!
//! # Engines
//!
//! All engines render by overwriting the output slice, so a slot can hand
//! them a scratch buffer without clearing it first.
//!
//! ```rust
//! use ether_synth::{SubtractiveEngine, SynthEngine};
//! use ether_core::AudioFrame;
//!
//! let mut synth = SubtractiveEngine::new(48000.0);
//! synth.note_on(60, 0.8, 0.0);
//! let mut block = [AudioFrame::SILENCE; 128];
//! synth.process(&mut block);
//! assert_eq!(synth.active_voice_count(), 1);
//! ```
//!
//! # no_std Support
//!
//! Disable the default `std` feature. The table bank then builds per engine
//! instead of once per process.
//!
//! ```toml
//! [dependencies]
//! ether-synth = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod engine;
pub mod engine_type;
pub mod engines;
pub mod envelope;
pub mod oscillator;
pub mod params;
pub mod path_latch;
pub mod vector_path;
pub mod voice;
pub mod wavetable;

pub use engine::{
    DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, MAX_VOICES, SynthEngine, velocity_from_midi,
};
pub use engine_type::{EngineCategory, EngineType};
pub use engines::{
    DrumKitEngine, DrumPad, DrumSound, FmAlgorithm, FmEngine, GrainSource, GranularEngine,
    SlideBassEngine, SlideMode, SubtractiveEngine, TextureMode, WavetableEngine,
};
pub use envelope::{AdsrEnvelope, DecayEnvelope, EnvelopeStage};
pub use oscillator::{Oscillator, Waveform};
pub use params::{PARAM_COUNT, ParameterBank, ParameterId, attack_ms, decay_ms, norm_to_exp};
pub use path_latch::{BeatDivision, LatchMode, LatchSync, PathLatch};
pub use vector_path::{PathPreset, VectorPath, Waypoint, corner_weights};
pub use voice::{Allocation, PolyVoice, VoicePool};
pub use wavetable::WavetableBank;
