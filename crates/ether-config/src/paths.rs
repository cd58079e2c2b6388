//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/ether/`
//! - macOS: `~/Library/Application Support/ether/`
//! - Windows: `%APPDATA%\ether\`

use std::path::{Path, PathBuf};

use crate::engine_config::EngineConfig;
use crate::error::{ConfigError, Result};

/// Application name used for directory paths.
const APP_NAME: &str = "ether";

/// Configuration file name.
const CONFIG_FILE: &str = "ether.toml";

/// User configuration directory; falls back to the working directory.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the default configuration file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Create the user configuration directory if needed.
pub fn ensure_user_config_dir() -> Result<PathBuf> {
    let dir = user_config_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}

/// Load `path` if it exists, otherwise return the defaults.
///
/// A file that exists but fails to parse or validate is an error.
pub fn load_or_default(path: &Path) -> Result<EngineConfig> {
    if path.is_file() {
        EngineConfig::load(path)
    } else {
        Ok(EngineConfig::default())
    }
}
