//! Engine type enumeration and categories.

/// Category of synthesis algorithm, for browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCategory {
    /// Melodic macro oscillators.
    Synthesizer,
    /// Chord and multi-voice generators.
    MultiVoice,
    /// Noise and texture generators.
    Texture,
    /// Physically modeled resonators.
    PhysicalModel,
    /// Percussion.
    Drum,
    /// Sample playback.
    Sampler,
    /// Granular synthesis.
    Granular,
    /// Filter-only processors.
    Filter,
}

impl EngineCategory {
    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            EngineCategory::Synthesizer => "Synthesizers",
            EngineCategory::MultiVoice => "Multi-Voice",
            EngineCategory::Texture => "Textures",
            EngineCategory::PhysicalModel => "Physical Models",
            EngineCategory::Drum => "Drums",
            EngineCategory::Sampler => "Sampler",
            EngineCategory::Granular => "Granular",
            EngineCategory::Filter => "Filter",
        }
    }
}

/// Closed set of algorithm families an instrument slot can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineType {
    /// Virtual-analog subtractive.
    #[default]
    MacroVa,
    /// Macro FM.
    MacroFm,
    /// Waveshaping oscillator.
    MacroWaveshaper,
    /// Wavetable with vector morphing.
    MacroWavetable,
    /// Chord generator.
    MacroChord,
    /// Additive harmonics.
    MacroHarmonics,
    /// Formant/vocal.
    FormantVocal,
    /// Noise particles.
    NoiseParticles,
    /// Tidal slope oscillator.
    TidesOsc,
    /// Modal resonator voice.
    RingsVoice,
    /// Exciter/resonator voice.
    ElementsVoice,
    /// Monophonic slide/accent bass.
    SlideAccentBass,
    /// Classic 4-operator FM.
    Classic4OpFm,
    /// Granular.
    Granular,
    /// Synthesized drum kit.
    DrumKit,
    /// Sample-based kit.
    SamplerKit,
    /// Sample slicer.
    SamplerSlicer,
    /// Serial high-pass/low-pass filter.
    SerialHpLp,
}

impl EngineType {
    /// All engine types in index order.
    pub const ALL: [EngineType; 18] = [
        EngineType::MacroVa,
        EngineType::MacroFm,
        EngineType::MacroWaveshaper,
        EngineType::MacroWavetable,
        EngineType::MacroChord,
        EngineType::MacroHarmonics,
        EngineType::FormantVocal,
        EngineType::NoiseParticles,
        EngineType::TidesOsc,
        EngineType::RingsVoice,
        EngineType::ElementsVoice,
        EngineType::SlideAccentBass,
        EngineType::Classic4OpFm,
        EngineType::Granular,
        EngineType::DrumKit,
        EngineType::SamplerKit,
        EngineType::SamplerSlicer,
        EngineType::SerialHpLp,
    ];

    /// Number of engine types.
    pub const COUNT: usize = Self::ALL.len();

    /// Engine type for an index, or `None` when out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position in [`EngineType::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            EngineType::MacroVa => "MacroVA",
            EngineType::MacroFm => "MacroFM",
            EngineType::MacroWaveshaper => "MacroWaveshaper",
            EngineType::MacroWavetable => "MacroWavetable",
            EngineType::MacroChord => "MacroChord",
            EngineType::MacroHarmonics => "MacroHarmonics",
            EngineType::FormantVocal => "FormantVocal",
            EngineType::NoiseParticles => "NoiseParticles",
            EngineType::TidesOsc => "TidesOsc",
            EngineType::RingsVoice => "RingsVoice",
            EngineType::ElementsVoice => "ElementsVoice",
            EngineType::SlideAccentBass => "SlideAccentBass",
            EngineType::Classic4OpFm => "Classic4OpFM",
            EngineType::Granular => "Granular",
            EngineType::DrumKit => "DrumKit",
            EngineType::SamplerKit => "SamplerKit",
            EngineType::SamplerSlicer => "SamplerSlicer",
            EngineType::SerialHpLp => "SerialHPLP",
        }
    }

    /// Browsing category.
    pub const fn category(self) -> EngineCategory {
        match self {
            EngineType::MacroVa
            | EngineType::MacroFm
            | EngineType::MacroWaveshaper
            | EngineType::MacroWavetable
            | EngineType::MacroHarmonics
            | EngineType::TidesOsc
            | EngineType::SlideAccentBass
            | EngineType::Classic4OpFm => EngineCategory::Synthesizer,
            EngineType::MacroChord => EngineCategory::MultiVoice,
            EngineType::FormantVocal | EngineType::NoiseParticles => EngineCategory::Texture,
            EngineType::RingsVoice | EngineType::ElementsVoice => EngineCategory::PhysicalModel,
            EngineType::DrumKit => EngineCategory::Drum,
            EngineType::SamplerKit | EngineType::SamplerSlicer => EngineCategory::Sampler,
            EngineType::Granular => EngineCategory::Granular,
            EngineType::SerialHpLp => EngineCategory::Filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_type_indices() {
        for (i, t) in EngineType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
            assert_eq!(EngineType::from_index(i), Some(*t));
        }
        assert_eq!(EngineType::from_index(EngineType::COUNT), None);
    }

    #[test]
    fn test_names_unique() {
        for (i, a) in EngineType::ALL.iter().enumerate() {
            for b in &EngineType::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(EngineType::DrumKit.category(), EngineCategory::Drum);
        assert_eq!(EngineType::Granular.category().name(), "Granular");
        assert_eq!(EngineType::SamplerKit.category(), EngineCategory::Sampler);
    }
}
