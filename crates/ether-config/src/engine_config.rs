//! Engine configuration file format.

use serde::{Deserialize, Serialize};
use std::path::Path;

use ether_registry::EngineRegistry;
use ether_synth::{EngineType, MAX_VOICES};

use crate::error::{ConfigError, Result};
use crate::validation::{ValidationError, validate_config};

/// Number of instrument slots.
pub const SLOT_COUNT: usize = 8;

/// Top-level engine configuration.
///
/// # TOML Format
///
/// ```toml
/// sample_rate = 48000
/// buffer_size = 128
/// master_volume = 0.8
/// bpm = 120.0
///
/// [[slots]]
/// engine = "macro_va"
/// volume = 0.8
/// pan = 0.5
/// reverb_send = 0.2
/// delay_send = 0.0
/// voices = 16
///
/// [fx]
/// reverb_size = 0.5
/// delay_time = 0.3
/// ```
///
/// Every field has a default, so an empty file is a valid configuration.
/// Slot `engine` names are registry ids (`"drum_kit"`) or display names
/// (`"DrumKit"`), matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per audio callback.
    pub buffer_size: usize,
    /// Master output level, 0 to 1.
    pub master_volume: f32,
    /// Tempo in beats per minute.
    pub bpm: f32,
    /// Instrument slots, at most [`SLOT_COUNT`].
    pub slots: Vec<SlotConfig>,
    /// Shared send effects.
    pub fx: FxConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let engines = [
            EngineType::MacroVa,
            EngineType::Classic4OpFm,
            EngineType::MacroWavetable,
            EngineType::Granular,
            EngineType::DrumKit,
            EngineType::SlideAccentBass,
            EngineType::MacroVa,
            EngineType::MacroVa,
        ];
        Self {
            sample_rate: 48000,
            buffer_size: 128,
            master_volume: 0.8,
            bpm: 120.0,
            slots: engines.into_iter().map(SlotConfig::for_engine).collect(),
            fx: FxConfig::default(),
        }
    }
}

/// Per-slot settings. All levels are normalized to 0..1; pan 0.5 is centre.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlotConfig {
    /// Engine id or display name.
    pub engine: String,
    /// Slot volume.
    pub volume: f32,
    /// Stereo position.
    pub pan: f32,
    /// Reverb send amount.
    pub reverb_send: f32,
    /// Delay send amount.
    pub delay_send: f32,
    /// Polyphony limit.
    pub voices: usize,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self::for_engine(EngineType::MacroVa)
    }
}

impl SlotConfig {
    /// Default slot settings for an engine type.
    pub fn for_engine(engine_type: EngineType) -> Self {
        let id = EngineRegistry::new()
            .find(engine_type)
            .map_or(engine_type.name(), |d| d.id);
        Self {
            engine: id.to_string(),
            volume: 0.8,
            pan: 0.5,
            reverb_send: 0.0,
            delay_send: 0.0,
            voices: MAX_VOICES,
        }
    }

    /// Set the volume.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Set the sends.
    pub fn with_sends(mut self, reverb: f32, delay: f32) -> Self {
        self.reverb_send = reverb;
        self.delay_send = delay;
        self
    }

    /// Catalog entry named by `engine`, if it exists.
    pub fn engine_type(&self) -> Option<EngineType> {
        parse_engine(&self.engine)
    }
}

/// Shared reverb and delay settings, normalized to 0..1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FxConfig {
    /// Reverb size.
    pub reverb_size: f32,
    /// Reverb high-frequency damping.
    pub reverb_damping: f32,
    /// Reverb wet level.
    pub reverb_mix: f32,
    /// Delay time.
    pub delay_time: f32,
    /// Delay feedback.
    pub delay_feedback: f32,
    /// Delay wet level.
    pub delay_mix: f32,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            reverb_size: 0.5,
            reverb_damping: 0.5,
            reverb_mix: 0.3,
            delay_time: 0.3,
            delay_feedback: 0.4,
            delay_mix: 0.3,
        }
    }
}

/// Look up an engine by registry id or display name, ignoring case.
pub fn parse_engine(name: &str) -> Option<EngineType> {
    let registry = EngineRegistry::new();
    registry
        .all_engines()
        .iter()
        .find(|d| d.id.eq_ignore_ascii_case(name) || d.name.eq_ignore_ascii_case(name))
        .map(|d| d.engine_type)
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Check every value against its range.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validate_config(self)
    }

    /// Engine types for each slot, padded to [`SLOT_COUNT`] with the default engine.
    ///
    /// Call after [`validate`](Self::validate); unknown names also map to the default.
    pub fn slot_engines(&self) -> [EngineType; SLOT_COUNT] {
        core::array::from_fn(|i| {
            self.slots
                .get(i)
                .and_then(SlotConfig::engine_type)
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_all_slots() {
        let config = EngineConfig::default();
        assert_eq!(config.slots.len(), SLOT_COUNT);
        assert_eq!(config.slots[4].engine, "drum_kit");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_slot_fills_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            bpm = 96.0

            [[slots]]
            engine = "DrumKit"
            volume = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(config.bpm, 96.0);
        assert_eq!(config.slots.len(), 1);
        assert_eq!(config.slots[0].engine_type(), Some(EngineType::DrumKit));
        assert_eq!(config.slots[0].voices, MAX_VOICES);
        assert_eq!(config.slots[0].pan, 0.5);
    }

    #[test]
    fn test_slot_engines_padded() {
        let config = EngineConfig {
            slots: vec![SlotConfig::for_engine(EngineType::Granular)],
            ..EngineConfig::default()
        };
        let engines = config.slot_engines();
        assert_eq!(engines[0], EngineType::Granular);
        assert!(engines[1..].iter().all(|&e| e == EngineType::MacroVa));
    }

    #[test]
    fn test_parse_engine_names() {
        assert_eq!(parse_engine("slide_accent_bass"), Some(EngineType::SlideAccentBass));
        assert_eq!(parse_engine("classic4opfm"), Some(EngineType::Classic4OpFm));
        assert_eq!(parse_engine("kazoo"), None);
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let config = EngineConfig {
            master_volume: 0.5,
            slots: vec![SlotConfig::for_engine(EngineType::DrumKit).with_sends(0.4, 0.1)],
            ..EngineConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("drum_kit"));
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }
}
