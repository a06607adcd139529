//! Persistent settings.
//!
//! Defaults, then `<config_dir>/sketchctl/config.json`, then the
//! `ARDUINO_BIN` environment variable. Command-line flags are applied on
//! top by the caller.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ports::BOARD_TAG;
use crate::toolchain::{ExitStatusPolicy, DEFAULT_PLATFORM, DEFAULT_TOOLCHAIN};

/// Environment variable naming the toolchain binary.
pub const TOOLCHAIN_ENV: &str = "ARDUINO_BIN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Toolchain binary name or path
    pub toolchain: PathBuf,
    /// `<vendor>:<architecture>` used to qualify bare board names
    pub platform: String,
    /// Substring identifying boards in port descriptions
    pub board_tag: String,
    /// Treat a non-zero toolchain exit as success
    pub ignore_exit_status: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            toolchain: PathBuf::from(DEFAULT_TOOLCHAIN),
            platform: DEFAULT_PLATFORM.to_string(),
            board_tag: BOARD_TAG.to_string(),
            ignore_exit_status: false,
        }
    }
}

impl Settings {
    /// Load settings from the default location plus the environment.
    pub fn load() -> Result<Self> {
        let mut settings = match Self::config_path() {
            Ok(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        if let Ok(bin) = std::env::var(TOOLCHAIN_ENV) {
            if !bin.is_empty() {
                settings.toolchain = PathBuf::from(bin);
            }
        }

        Ok(settings)
    }

    /// Path of the settings file.
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(base.join("sketchctl").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    pub fn exit_status_policy(&self) -> ExitStatusPolicy {
        if self.ignore_exit_status {
            ExitStatusPolicy::Ignore
        } else {
            ExitStatusPolicy::Enforce
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "platform": "esp32:esp32" }"#).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.platform, "esp32:esp32");
        assert_eq!(settings.toolchain, PathBuf::from(DEFAULT_TOOLCHAIN));
        assert_eq!(settings.exit_status_policy(), ExitStatusPolicy::Enforce);
    }

    #[test]
    fn test_bad_file_names_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(format!("{err}").contains("config.json"));
    }
}
