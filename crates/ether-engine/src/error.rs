//! Error types for engine construction.
//!
//! The audio path never fails: bad indices are ignored and values are
//! clamped. Only building an engine from a configuration can return an error.

use thiserror::Error;

use ether_config::{ConfigError, ValidationError};

/// Errors raised while building an [`AudioEngine`](crate::AudioEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration failed its range checks.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(#[source] ValidationError),

    /// Loading the configuration file failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidConfig(err)
    }
}

/// Result alias for engine construction.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message() {
        let err = EngineError::from(ValidationError::UnknownEngine("kazoo".into()));
        let msg = err.to_string();
        assert!(msg.contains("invalid engine configuration"));
        assert!(msg.contains("kazoo"));
    }

    #[test]
    fn test_config_error_passthrough() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = EngineError::from(ConfigError::read_file("/tmp/ether.toml", io));
        assert!(matches!(err, EngineError::Config(ConfigError::ReadFile { .. })));
    }
}
