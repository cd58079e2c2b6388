//! Engine registry and factory for the ether synthesizer.
//!
//! A static descriptor table covers every [`EngineType`] in the catalog.
//! Six of them have native implementations; the rest resolve to the closest
//! native engine through a fixed fallback table, so asking for any type
//! always yields a working engine.
//!
//! | Requested | Built |
//! |-----------|-------|
//! | SamplerKit, DrumKit | [`DrumKitEngine`] |
//! | MacroFm, Classic4OpFm | [`FmEngine`] |
//! | MacroWavetable, MacroWaveshaper | [`WavetableEngine`] |
//! | SlideAccentBass | [`SlideBassEngine`] |
//! | Granular, NoiseParticles | [`GranularEngine`] |
//! | everything else | [`SubtractiveEngine`] |
//!
//! # Example
//!
//! ```rust
//! use ether_registry::EngineRegistry;
//! use ether_synth::{EngineCategory, EngineType};
//!
//! let registry = EngineRegistry::new();
//!
//! for engine in registry.all_engines() {
//!     println!("{}: {}", engine.name, engine.description);
//! }
//!
//! // Unimplemented types still produce an engine.
//! let engine = registry.create(EngineType::RingsVoice, 48000.0);
//! assert_eq!(engine.engine_type(), EngineType::MacroVa);
//!
//! let drums = registry.engines_in_category(EngineCategory::Drum);
//! assert!(!drums.is_empty());
//! ```
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! ether-registry = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::{boxed::Box, vec::Vec};

use ether_synth::{
    DrumKitEngine, EngineCategory, EngineType, FmEngine, GranularEngine, SlideBassEngine,
    SubtractiveEngine, SynthEngine, WavetableEngine,
};

/// Describes an engine type in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineDescriptor {
    /// Stable identifier (lowercase, no spaces).
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Catalog entry.
    pub engine_type: EngineType,
    /// Category for browsing.
    pub category: EngineCategory,
    /// Whether the type has its own implementation rather than a fallback.
    pub native: bool,
}

const fn descriptor(
    engine_type: EngineType,
    id: &'static str,
    description: &'static str,
    native: bool,
) -> EngineDescriptor {
    EngineDescriptor {
        id,
        name: engine_type.name(),
        description,
        engine_type,
        category: engine_type.category(),
        native,
    }
}

/// Every catalog entry, in [`EngineType::ALL`] order.
static DESCRIPTORS: [EngineDescriptor; EngineType::COUNT] = [
    descriptor(EngineType::MacroVa, "macro_va", "Two-oscillator virtual analog with resonant low-pass", true),
    descriptor(EngineType::MacroFm, "macro_fm", "Two-operator macro FM", false),
    descriptor(EngineType::MacroWaveshaper, "macro_waveshaper", "Wavefolding and waveshaping oscillator", false),
    descriptor(EngineType::MacroWavetable, "macro_wavetable", "Four-corner wavetable on a vector path", true),
    descriptor(EngineType::MacroChord, "macro_chord", "Paraphonic chord oscillator", false),
    descriptor(EngineType::MacroHarmonics, "macro_harmonics", "Additive harmonic oscillator", false),
    descriptor(EngineType::FormantVocal, "formant_vocal", "Formant filter bank vocal synthesis", false),
    descriptor(EngineType::NoiseParticles, "noise_particles", "Filtered noise and dust particles", false),
    descriptor(EngineType::TidesOsc, "tides_osc", "Slope-shaped tidal oscillator", false),
    descriptor(EngineType::RingsVoice, "rings_voice", "Modal resonator voice", false),
    descriptor(EngineType::ElementsVoice, "elements_voice", "Exciter and resonator physical model", false),
    descriptor(EngineType::SlideAccentBass, "slide_accent_bass", "Monophonic bass with slide and accent", true),
    descriptor(EngineType::Classic4OpFm, "classic_4op_fm", "Four-operator FM with eight algorithms", true),
    descriptor(EngineType::Granular, "granular", "Windowed grain cloud over synthetic sources", true),
    descriptor(EngineType::DrumKit, "drum_kit", "Synthesized 808 and 909 style kit", true),
    descriptor(EngineType::SamplerKit, "sampler_kit", "Sample-based drum kit", false),
    descriptor(EngineType::SamplerSlicer, "sampler_slicer", "Sliced sample player", false),
    descriptor(EngineType::SerialHpLp, "serial_hplp", "Serial high-pass into low-pass filter voice", false),
];

/// Native engine that stands in for `engine_type`.
pub const fn resolve(engine_type: EngineType) -> EngineType {
    match engine_type {
        EngineType::DrumKit | EngineType::SamplerKit => EngineType::DrumKit,
        EngineType::MacroFm | EngineType::Classic4OpFm => EngineType::Classic4OpFm,
        EngineType::MacroWavetable | EngineType::MacroWaveshaper => EngineType::MacroWavetable,
        EngineType::SlideAccentBass => EngineType::SlideAccentBass,
        EngineType::Granular | EngineType::NoiseParticles => EngineType::Granular,
        _ => EngineType::MacroVa,
    }
}

/// Factory function type for creating engines.
type EngineFactory = fn(f32) -> Box<dyn SynthEngine>;

fn factory(engine_type: EngineType) -> EngineFactory {
    match resolve(engine_type) {
        EngineType::DrumKit => |sr| Box::new(DrumKitEngine::new(sr)),
        EngineType::Classic4OpFm => |sr| Box::new(FmEngine::new(sr)),
        EngineType::MacroWavetable => |sr| Box::new(WavetableEngine::new(sr)),
        EngineType::SlideAccentBass => |sr| Box::new(SlideBassEngine::new(sr)),
        EngineType::Granular => |sr| Box::new(GranularEngine::new(sr)),
        _ => |sr| Box::new(SubtractiveEngine::new(sr)),
    }
}

/// Build an engine for `engine_type`, falling back where needed.
pub fn create_engine(engine_type: EngineType, sample_rate: f32) -> Box<dyn SynthEngine> {
    #[cfg(feature = "tracing")]
    if resolve(engine_type) != engine_type {
        tracing::debug!(
            requested = engine_type.name(),
            built = resolve(engine_type).name(),
            "engine type has no native implementation, using fallback"
        );
    }
    factory(engine_type)(sample_rate)
}

/// Registry of all engine types.
///
/// Lookup by catalog entry or by string id, browsing by category, and
/// construction through [`create`](Self::create).
#[derive(Debug, Clone, Copy)]
pub struct EngineRegistry {
    entries: &'static [EngineDescriptor],
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRegistry {
    /// Registry over the built-in table.
    pub fn new() -> Self {
        Self {
            entries: &DESCRIPTORS,
        }
    }

    /// Descriptors for all engine types.
    pub fn all_engines(&self) -> &'static [EngineDescriptor] {
        self.entries
    }

    /// Descriptors for types with their own implementation.
    pub fn native_engines(&self) -> Vec<&'static EngineDescriptor> {
        self.entries.iter().filter(|d| d.native).collect()
    }

    /// Descriptors in a category.
    pub fn engines_in_category(&self, category: EngineCategory) -> Vec<&'static EngineDescriptor> {
        self.entries
            .iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// Descriptor by string id.
    pub fn get(&self, id: &str) -> Option<&'static EngineDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    /// Descriptor for a catalog entry.
    pub fn find(&self, engine_type: EngineType) -> Option<&'static EngineDescriptor> {
        self.entries.iter().find(|d| d.engine_type == engine_type)
    }

    /// Build an engine; never fails.
    pub fn create(&self, engine_type: EngineType, sample_rate: f32) -> Box<dyn SynthEngine> {
        create_engine(engine_type, sample_rate)
    }

    /// Build an engine by string id; `None` if the id is unknown.
    pub fn create_by_id(&self, id: &str, sample_rate: f32) -> Option<Box<dyn SynthEngine>> {
        self.get(id)
            .map(|d| create_engine(d.engine_type, sample_rate))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_catalog() {
        let registry = EngineRegistry::new();
        assert_eq!(registry.len(), EngineType::COUNT);
        for (descriptor, kind) in registry.all_engines().iter().zip(EngineType::ALL) {
            assert_eq!(descriptor.engine_type, kind, "table out of catalog order");
        }
    }

    #[test]
    fn test_ids_unique() {
        let registry = EngineRegistry::new();
        for (i, a) in registry.all_engines().iter().enumerate() {
            for b in &registry.all_engines()[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_get_engine() {
        let registry = EngineRegistry::new();

        let fm = registry.get("classic_4op_fm");
        assert!(fm.is_some());
        assert_eq!(fm.unwrap().name, "Classic4OpFM");

        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_native_engines_build_themselves() {
        let registry = EngineRegistry::new();
        let native = registry.native_engines();
        assert_eq!(native.len(), 6);
        for descriptor in native {
            let engine = registry.create(descriptor.engine_type, 48000.0);
            assert_eq!(engine.engine_type(), descriptor.engine_type);
        }
    }

    #[test]
    fn test_fallback_table() {
        assert_eq!(resolve(EngineType::SamplerKit), EngineType::DrumKit);
        assert_eq!(resolve(EngineType::MacroFm), EngineType::Classic4OpFm);
        assert_eq!(resolve(EngineType::MacroWaveshaper), EngineType::MacroWavetable);
        assert_eq!(resolve(EngineType::NoiseParticles), EngineType::Granular);
        assert_eq!(resolve(EngineType::FormantVocal), EngineType::MacroVa);
        assert_eq!(resolve(EngineType::SerialHpLp), EngineType::MacroVa);
    }

    #[test]
    fn test_every_type_creates_and_renders() {
        let registry = EngineRegistry::new();
        for descriptor in registry.all_engines() {
            let mut engine = registry.create(descriptor.engine_type, 48000.0);
            engine.note_on(60, 0.8, 0.0);
            let mut buf = [ether_core::AudioFrame::SILENCE; 256];
            engine.process(&mut buf);
            assert!(
                buf.iter().all(|f| f.is_finite()),
                "Engine {} produced non-finite output",
                descriptor.id
            );
        }
    }

    #[test]
    fn test_create_by_id() {
        let registry = EngineRegistry::new();
        let engine = registry.create_by_id("drum_kit", 48000.0);
        assert!(engine.is_some());
        assert!(registry.create_by_id("theremin", 48000.0).is_none());
    }

    #[test]
    fn test_engines_by_category() {
        let registry = EngineRegistry::new();
        let drums = registry.engines_in_category(EngineCategory::Drum);
        assert!(drums.iter().any(|d| d.engine_type == EngineType::DrumKit));
        assert!(drums.iter().all(|d| d.category == EngineCategory::Drum));
    }
}
