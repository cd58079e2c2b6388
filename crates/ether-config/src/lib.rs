//! TOML configuration for the ether synthesizer.
//!
//! An [`EngineConfig`] describes the audio format, tempo, the eight
//! instrument slots and the shared send effects. Files are loaded with
//! `serde` + `toml`, checked against the engine registry and value ranges,
//! and saved back with the same layout.
//!
//! # Example
//!
//! ```rust,no_run
//! use ether_config::{EngineConfig, SlotConfig, default_config_path};
//! use ether_synth::EngineType;
//!
//! let mut config = EngineConfig::load(default_config_path()).unwrap_or_default();
//! config.bpm = 128.0;
//! config.slots[0] = SlotConfig::for_engine(EngineType::DrumKit).with_sends(0.2, 0.0);
//! config.save(default_config_path()).unwrap();
//! ```

mod engine_config;
mod error;

/// Platform-specific configuration paths.
#[cfg(feature = "std")]
pub mod paths;

/// Range and name checks.
pub mod validation;

pub use engine_config::{EngineConfig, FxConfig, SLOT_COUNT, SlotConfig, parse_engine};
pub use error::{ConfigError, Result};
#[cfg(feature = "std")]
pub use paths::{default_config_path, ensure_user_config_dir, load_or_default, user_config_dir};
pub use validation::{ValidationError, ValidationResult, validate_config, validate_engine};
