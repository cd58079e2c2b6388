//! Real-time audio engine for the ether synthesizer.
//!
//! Eight instrument slots, each holding one [`SynthEngine`](ether_synth::SynthEngine)
//! with its own post chain and eight routable LFOs, mixed into a shared
//! delay and reverb and a tanh-limited master bus.
//!
//! The engine is split in two halves:
//!
//! - [`AudioEngine`] lives on the audio thread and renders blocks.
//! - [`ControlHandle`] is cloned to every other thread. Scalar state
//!   (tempo, transport, master volume, meters) is read and written through
//!   atomics; engine and slot changes are queued on a bounded lock-free
//!   channel and applied at the next block boundary.
//!
//! # Example
//!
//! ```rust
//! use ether_config::EngineConfig;
//! use ether_core::AudioFrame;
//! use ether_engine::{AudioEngine, FxSend};
//! use ether_synth::{EngineType, ParameterId};
//!
//! let (mut engine, control) = AudioEngine::new(EngineConfig::default())?;
//!
//! // Control thread
//! control.set_engine_type(0, EngineType::Classic4OpFm);
//! control.set_parameter(0, ParameterId::FilterCutoff, 0.6);
//! control.assign_lfo(0, 0, ParameterId::Pan, 0.5);
//! control.set_fx_send(0, FxSend::Reverb, 0.3);
//! control.note_on(57, 0.9, 0.0);
//!
//! // Audio thread
//! let mut block = [AudioFrame::SILENCE; 128];
//! engine.process(&mut block);
//! assert!(control.peak() <= 1.0);
//! # Ok::<(), ether_engine::EngineError>(())
//! ```

mod command;
mod control;
mod engine;
mod error;
pub mod fx;
pub mod meter;
pub mod modulation;
pub mod post;
mod shared;
mod slot;

pub use command::FxSend;
pub use control::{ControlHandle, KEY_BASE_NOTE, key_note};
pub use engine::{AudioEngine, COMMAND_QUEUE_CAPACITY, RETIRE_QUEUE_CAPACITY};
pub use error::{EngineError, Result};
pub use meter::CpuMeter;
pub use modulation::{LFO_COUNT, ModAssignment, ModulationTable};
pub use post::{PostChain, PostValues, Routing};
pub use shared::AtomicParam;

pub use ether_config::{EngineConfig, SLOT_COUNT};
