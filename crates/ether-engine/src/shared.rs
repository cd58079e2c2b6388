//! Lock-free state shared between the control handle and the audio thread.
//!
//! Scalars live in atomics so reads never wait on the audio callback. The
//! control side writes parameters and transport, the audio side writes
//! meters and modulation read-back.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use ether_config::SLOT_COUNT;
use ether_config::validation::{MAX_BPM, MIN_BPM};
use ether_synth::{EngineType, MAX_VOICES, PARAM_COUNT, ParameterId, SynthEngine};

use crate::modulation::LFO_COUNT;
use crate::post::Routing;

/// A thread-safe parameter stored as f32 bits.
///
/// Writers clamp into `min..=max`; non-finite writes are dropped.
#[derive(Debug)]
pub struct AtomicParam {
    value: AtomicU32,
    min: f32,
    max: f32,
}

impl AtomicParam {
    /// Create a parameter with a default and range.
    pub fn new(default: f32, min: f32, max: f32) -> Self {
        Self {
            value: AtomicU32::new(default.clamp(min, max).to_bits()),
            min,
            max,
        }
    }

    /// Store a value.
    #[inline]
    pub fn set(&self, v: f32) {
        if v.is_finite() {
            let clamped = v.clamp(self.min, self.max);
            self.value.store(clamped.to_bits(), Ordering::Release);
        }
    }

    /// Load the value.
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }
}

/// Post-chain parameters the shadow table starts from instead of the engine.
pub(crate) const POST_DEFAULTS: [(ParameterId, f32); 7] = [
    (ParameterId::Hpf, 0.0),
    (ParameterId::FilterCutoff, 1.0),
    (ParameterId::FilterResonance, 0.0),
    (ParameterId::Volume, 0.5),
    (ParameterId::Amplitude, 0.5),
    (ParameterId::Pan, 0.5),
    (ParameterId::Clip, 0.0),
];

/// Per-slot mirror of engine and modulation state.
#[derive(Debug)]
pub(crate) struct SlotShared {
    /// Last value written per parameter, 0..1.
    pub params: [AtomicParam; PARAM_COUNT],
    /// Summed modulation per parameter from the last block.
    pub modulation: [AtomicParam; PARAM_COUNT],
    /// LFO assignment bits per parameter.
    pub masks: [AtomicU8; PARAM_COUNT],
    /// Requested engine type index.
    pub engine_type: AtomicU8,
    /// Active voices after the last block.
    pub voices: AtomicUsize,
    /// Polyphony limit last requested.
    pub voice_limit: AtomicUsize,
}

impl SlotShared {
    fn new(engine_type: EngineType) -> Self {
        let limit = LFO_COUNT as f32;
        Self {
            params: core::array::from_fn(|_| AtomicParam::new(0.0, 0.0, 1.0)),
            modulation: core::array::from_fn(|_| AtomicParam::new(0.0, -limit, limit)),
            masks: core::array::from_fn(|_| AtomicU8::new(0)),
            engine_type: AtomicU8::new(engine_type.index() as u8),
            voices: AtomicUsize::new(0),
            voice_limit: AtomicUsize::new(MAX_VOICES),
        }
    }

    pub fn engine_type(&self) -> EngineType {
        EngineType::from_index(self.engine_type.load(Ordering::Acquire) as usize)
            .unwrap_or_default()
    }
}

/// Everything both threads can see.
#[derive(Debug)]
pub(crate) struct SharedState {
    pub bpm: AtomicParam,
    pub master_volume: AtomicParam,
    pub playing: AtomicBool,
    pub recording: AtomicBool,
    pub active_slot: AtomicUsize,
    pub slots: [SlotShared; SLOT_COUNT],
    pub cpu_usage: AtomicParam,
    pub peak: AtomicParam,
    pub rms: AtomicParam,
    pub active_voices: AtomicUsize,
    pub dropped_commands: AtomicU64,
    pub running: AtomicBool,
}

impl SharedState {
    pub fn new(bpm: f32, master_volume: f32, engines: &[EngineType; SLOT_COUNT]) -> Self {
        Self {
            bpm: AtomicParam::new(bpm, MIN_BPM, MAX_BPM),
            master_volume: AtomicParam::new(master_volume, 0.0, 1.0),
            playing: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            active_slot: AtomicUsize::new(0),
            slots: core::array::from_fn(|i| SlotShared::new(engines[i])),
            cpu_usage: AtomicParam::new(0.0, 0.0, 400.0),
            peak: AtomicParam::new(0.0, 0.0, f32::MAX),
            rms: AtomicParam::new(0.0, 0.0, f32::MAX),
            active_voices: AtomicUsize::new(0),
            dropped_commands: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }

    pub fn slot(&self, slot: usize) -> Option<&SlotShared> {
        self.slots.get(slot)
    }

    /// Reset a slot's post-chain shadow values to the chain defaults.
    pub fn seed_post_params(&self, slot: usize) {
        if let Some(shared) = self.slot(slot) {
            for (id, value) in POST_DEFAULTS {
                shared.params[id.index()].set(value);
            }
        }
    }

    /// Copy an engine's own parameter values into the shadow table.
    ///
    /// Parameters the post chain owns keep their current shadow value.
    pub fn seed_engine_params(&self, slot: usize, engine: &dyn SynthEngine) {
        self.seed_snapshot(slot, &engine_snapshot(engine));
    }

    /// Copy engine-routed values from a snapshot into a slot's shadow table.
    pub fn seed_snapshot(&self, slot: usize, snapshot: &[f32; PARAM_COUNT]) {
        let Some(shared) = self.slot(slot) else {
            return;
        };
        for id in ParameterId::ALL {
            if Routing::of(id) == Routing::Engine {
                shared.params[id.index()].set(snapshot[id.index()]);
            }
        }
    }
}

/// Every parameter value an engine currently holds.
pub(crate) fn engine_snapshot(engine: &dyn SynthEngine) -> [f32; PARAM_COUNT] {
    let mut values = [0.0; PARAM_COUNT];
    for id in ParameterId::ALL {
        values[id.index()] = engine.get_parameter(id);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostValues;

    #[test]
    fn test_atomic_param_clamps() {
        let p = AtomicParam::new(0.5, 0.0, 1.0);
        p.set(2.0);
        assert_eq!(p.get(), 1.0);
        p.set(-1.0);
        assert_eq!(p.get(), 0.0);
    }

    #[test]
    fn test_atomic_param_rejects_nan() {
        let p = AtomicParam::new(0.25, 0.0, 1.0);
        p.set(f32::NAN);
        assert_eq!(p.get(), 0.25);
        p.set(f32::INFINITY);
        assert_eq!(p.get(), 0.25);
    }

    #[test]
    fn test_bpm_range() {
        let state = SharedState::new(500.0, 0.8, &[EngineType::MacroVa; SLOT_COUNT]);
        assert_eq!(state.bpm.get(), MAX_BPM);
        state.bpm.set(5.0);
        assert_eq!(state.bpm.get(), MIN_BPM);
    }

    #[test]
    fn test_post_defaults_match_chain() {
        let mut values = PostValues::default();
        for (id, v) in POST_DEFAULTS {
            assert!(values.set_normalized(id, v));
        }
        assert_eq!(values, PostValues::default());
    }

    #[test]
    fn test_engine_type_roundtrip() {
        let state = SharedState::new(120.0, 0.8, &[EngineType::RingsVoice; SLOT_COUNT]);
        assert_eq!(state.slots[3].engine_type(), EngineType::RingsVoice);
    }
}
