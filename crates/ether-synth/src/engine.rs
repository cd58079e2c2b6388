//! The synthesis engine contract.
//!
//! Every algorithm family implements [`SynthEngine`]. The audio engine holds
//! one `Box<dyn SynthEngine>` per instrument slot and only ever talks to it
//! through this trait.
//!
//! # Render convention
//!
//! [`SynthEngine::process`] **overwrites** the whole block: every frame of
//! the output slice is written, silence included. Callers do not need to
//! clear the buffer first, and must not expect the engine to mix into it.
//!
//! # Real-time rules
//!
//! - `process` never allocates, blocks, or panics.
//! - Note and parameter calls never allocate; they only mutate voice state.
//! - Out-of-range notes, non-finite values and unsupported parameters are
//!   ignored silently.

use ether_core::AudioFrame;

use crate::engine_type::EngineType;
use crate::params::ParameterId;

/// Upper bound on simultaneously sounding voices in any polyphonic engine.
pub const MAX_VOICES: usize = 16;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;

/// Default render quantum in frames.
pub const DEFAULT_BLOCK_SIZE: usize = 128;

/// Object-safe contract shared by every synthesis algorithm.
pub trait SynthEngine: Send {
    /// Which algorithm family this is.
    fn engine_type(&self) -> EngineType;

    /// Display name.
    fn name(&self) -> &'static str {
        self.engine_type().name()
    }

    /// One-line description.
    fn description(&self) -> &'static str;

    /// Start a note. `velocity` and `aftertouch` are normalized to [0, 1].
    fn note_on(&mut self, note: u8, velocity: f32, aftertouch: f32);

    /// Release a note. Sounding voices move to their release stage.
    fn note_off(&mut self, note: u8);

    /// Polyphonic pressure for a held note.
    fn set_aftertouch(&mut self, _note: u8, _value: f32) {}

    /// Silence every voice immediately.
    fn all_notes_off(&mut self);

    /// Set a normalized parameter. Unsupported IDs are ignored.
    fn set_parameter(&mut self, id: ParameterId, value: f32);

    /// Read a normalized parameter; unsupported IDs read as 0.
    fn get_parameter(&self, id: ParameterId) -> f32;

    /// Whether this engine honors `id`.
    fn has_parameter(&self, id: ParameterId) -> bool;

    /// Render exactly `output.len()` frames, overwriting the slice.
    fn process(&mut self, output: &mut [AudioFrame]);

    /// Voices currently sounding (attack through release).
    fn active_voice_count(&self) -> usize;

    /// Current polyphony limit.
    fn max_voice_count(&self) -> usize;

    /// Change the polyphony limit, clamped to `1..=MAX_VOICES`. Voices above
    /// the new limit are silenced. Mono engines ignore this.
    fn set_voice_count(&mut self, _count: usize) {}

    /// Change the sample rate. Voices are silenced.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Hint of the typical block size; engines render any length regardless.
    fn set_buffer_size(&mut self, _frames: usize) {}

    /// Host tempo in BPM, for engines with tempo-locked motion.
    fn set_tempo(&mut self, _bpm: f32) {}

    /// Whether [`SynthEngine::set_aftertouch`] has a per-note effect.
    fn supports_poly_aftertouch(&self) -> bool {
        false
    }
}

/// Convert a MIDI-style 0..=127 velocity to the normalized range.
#[inline]
pub fn velocity_from_midi(velocity: u8) -> f32 {
    f32::from(velocity.min(127)) / 127.0
}

/// Validate a note number from the boundary.
#[inline]
pub(crate) fn valid_note(note: u8) -> bool {
    note <= 127
}

/// Sanitize a normalized velocity; NaN becomes 0.
#[inline]
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
