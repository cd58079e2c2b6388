//! Range and name checks for engine configurations.
//!
//! Every problem found is reported, not just the first.
//!
//! ```rust
//! use ether_config::{EngineConfig, ValidationError};
//!
//! let mut config = EngineConfig::default();
//! config.bpm = 500.0;
//! assert!(matches!(config.validate(), Err(ValidationError::OutOfRange { .. })));
//! ```

use thiserror::Error;

use ether_synth::MAX_VOICES;

use crate::engine_config::{EngineConfig, SLOT_COUNT, parse_engine};

/// Lowest accepted sample rate.
pub const MIN_SAMPLE_RATE: u32 = 8000;
/// Highest accepted sample rate.
pub const MAX_SAMPLE_RATE: u32 = 192_000;
/// Lowest accepted tempo.
pub const MIN_BPM: f32 = 20.0;
/// Highest accepted tempo.
pub const MAX_BPM: f32 = 300.0;
/// Largest accepted callback size.
pub const MAX_BUFFER_SIZE: usize = 4096;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Engine name not in the registry.
    #[error("unknown engine type: {0}")]
    UnknownEngine(String),

    /// Value outside its range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the field, e.g. `slots[2].volume`.
        field: String,
        /// The rejected value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// More slots than the engine has.
    #[error("{0} slots configured, at most {max} supported", max = SLOT_COUNT)]
    TooManySlots(usize),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

struct Collector(Vec<ValidationError>);

impl Collector {
    fn range(&mut self, field: impl Into<String>, value: f64, min: f64, max: f64) {
        if !(value.is_finite() && (min..=max).contains(&value)) {
            self.0.push(ValidationError::OutOfRange {
                field: field.into(),
                value,
                min,
                max,
            });
        }
    }

    fn unit(&mut self, field: impl Into<String>, value: f32) {
        self.range(field, f64::from(value), 0.0, 1.0);
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.0.len() {
            0 => Ok(()),
            1 => Err(self.0.remove(0)),
            _ => Err(ValidationError::Multiple(self.0)),
        }
    }
}

/// Check an engine name against the registry.
pub fn validate_engine(name: &str) -> ValidationResult<()> {
    parse_engine(name)
        .map(|_| ())
        .ok_or_else(|| ValidationError::UnknownEngine(name.to_string()))
}

/// Check every field of `config`.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    let mut errors = Collector(Vec::new());

    errors.range(
        "sample_rate",
        f64::from(config.sample_rate),
        f64::from(MIN_SAMPLE_RATE),
        f64::from(MAX_SAMPLE_RATE),
    );
    errors.range("buffer_size", config.buffer_size as f64, 1.0, MAX_BUFFER_SIZE as f64);
    errors.unit("master_volume", config.master_volume);
    errors.range("bpm", f64::from(config.bpm), f64::from(MIN_BPM), f64::from(MAX_BPM));

    if config.slots.len() > SLOT_COUNT {
        errors.0.push(ValidationError::TooManySlots(config.slots.len()));
    }
    for (i, slot) in config.slots.iter().enumerate() {
        if let Err(e) = validate_engine(&slot.engine) {
            errors.0.push(e);
        }
        errors.unit(format!("slots[{i}].volume"), slot.volume);
        errors.unit(format!("slots[{i}].pan"), slot.pan);
        errors.unit(format!("slots[{i}].reverb_send"), slot.reverb_send);
        errors.unit(format!("slots[{i}].delay_send"), slot.delay_send);
        errors.range(format!("slots[{i}].voices"), slot.voices as f64, 1.0, MAX_VOICES as f64);
    }

    let fx = &config.fx;
    errors.unit("fx.reverb_size", fx.reverb_size);
    errors.unit("fx.reverb_damping", fx.reverb_damping);
    errors.unit("fx.reverb_mix", fx.reverb_mix);
    errors.unit("fx.delay_time", fx.delay_time);
    errors.unit("fx.delay_feedback", fx.delay_feedback);
    errors.unit("fx.delay_mix", fx.delay_mix);

    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_config::SlotConfig;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(validate_config(&EngineConfig::default()), Ok(()));
    }

    #[test]
    fn test_unknown_engine() {
        assert_eq!(
            validate_engine("theremin"),
            Err(ValidationError::UnknownEngine("theremin".to_string()))
        );
        assert!(validate_engine("granular").is_ok());
    }

    #[test]
    fn test_single_error_unwrapped() {
        let config = EngineConfig {
            sample_rate: 1000,
            ..EngineConfig::default()
        };
        match validate_config(&config) {
            Err(ValidationError::OutOfRange { field, .. }) => assert_eq!(field, "sample_rate"),
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = EngineConfig::default();
        config.master_volume = 2.0;
        config.slots[1].voices = 0;
        config.slots[2].engine = "kazoo".to_string();
        config.fx.delay_mix = f32::NAN;
        match validate_config(&config) {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[test]
    fn test_too_many_slots() {
        let config = EngineConfig {
            slots: vec![SlotConfig::default(); SLOT_COUNT + 1],
            ..EngineConfig::default()
        };
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::TooManySlots(SLOT_COUNT + 1))
        );
    }

    #[test]
    fn test_field_path_in_message() {
        let mut config = EngineConfig::default();
        config.slots[3].pan = -1.0;
        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("slots[3].pan"), "got: {msg}");
    }
}
