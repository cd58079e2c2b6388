//! The six built-in synthesis algorithms.
//!
//! | Engine | Voices | Macro mapping (H / T / M) |
//! |--------|--------|---------------------------|
//! | [`SubtractiveEngine`] | 16 | osc mix / cutoff / resonance |
//! | [`FmEngine`] | 16 | modulator ratio / index / feedback |
//! | [`WavetableEngine`] | 16 | table scan / formant + tilt / path position |
//! | [`GranularEngine`] | 16 | source position / density / grain size |
//! | [`DrumKitEngine`] | 16 | tune / 808-909 character / decay scale |
//! | [`SlideBassEngine`] | 1 | cutoff / shape + drive / portamento |

pub mod drum_kit;
pub mod fm;
pub mod granular;
pub mod slide_bass;
pub mod subtractive;
pub mod wavetable;

pub use drum_kit::{DrumKitEngine, DrumPad, DrumSound};
pub use fm::{FmAlgorithm, FmEngine};
pub use granular::{GrainSource, GranularEngine, TextureMode};
pub use slide_bass::{SlideBassEngine, SlideMode};
pub use subtractive::SubtractiveEngine;
pub use wavetable::WavetableEngine;

use crate::envelope::AdsrEnvelope;
use crate::params::{ParameterBank, ParameterId, attack_ms, decay_ms};

/// Default envelope controls shared by the melodic engines.
pub(crate) const ADSR_DEFAULTS: [(ParameterId, f32); 4] = [
    (ParameterId::Attack, 0.1),
    (ParameterId::Decay, 0.4),
    (ParameterId::Sustain, 0.7),
    (ParameterId::Release, 0.4),
];

/// Push the bank's envelope controls into `env`.
pub(crate) fn apply_adsr(env: &mut AdsrEnvelope, params: &ParameterBank) {
    env.set_attack_ms(attack_ms(params.get(ParameterId::Attack)));
    env.set_decay_ms(decay_ms(params.get(ParameterId::Decay)));
    env.set_sustain(params.get(ParameterId::Sustain));
    env.set_release_ms(decay_ms(params.get(ParameterId::Release)));
}

/// Whether `id` is one of the envelope controls.
pub(crate) fn is_adsr(id: ParameterId) -> bool {
    matches!(
        id,
        ParameterId::Attack | ParameterId::Decay | ParameterId::Sustain | ParameterId::Release
    )
}

/// Per-voice gain that keeps `active` summed voices near unity.
#[inline]
pub(crate) fn poly_gain(active: usize) -> f32 {
    0.8 / libm::sqrtf(active.max(1) as f32)
}
