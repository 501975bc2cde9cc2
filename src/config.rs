//! Configuration loading for enerplan.
//!
//! Settings are constructed once at process start and passed by value into
//! the wiring code. There is no ambient global configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Chat agent configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ChatSettings {
    /// Optional FAQ glossary file (JSON with a top-level "faq" array).
    pub glossary_path: Option<PathBuf>,
}

/// enerplan settings.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    #[serde(default)]
    pub chat: ChatSettings,

    /// Timeout in seconds for a CLI round trip over the bus.
    #[serde(default = "default_ask_timeout_seconds")]
    pub ask_timeout_seconds: u64,

    /// Optional log directory override.
    pub log_dir: Option<PathBuf>,
}

fn default_ask_timeout_seconds() -> u64 {
    15
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chat: ChatSettings::default(),
            ask_timeout_seconds: default_ask_timeout_seconds(),
            log_dir: None,
        }
    }
}

/// Get the default settings file path (~/.config on Linux).
pub fn default_settings_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "enerplan", "enerplan")
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(dirs.config_dir().join("settings.json"))
}

/// Load settings from a JSON file, or defaults when the file does not exist.
pub fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.clone(),
        None => default_settings_path()?,
    };

    if !path.exists() {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.ask_timeout_seconds == 0 {
        return Err(Error::Config(
            "ask_timeout_seconds must be positive".to_string(),
        ));
    }
    if let Some(glossary) = settings.chat.glossary_path.as_ref() {
        if !glossary.exists() {
            return Err(Error::Config(format!(
                "chat.glossary_path '{}' does not exist",
                glossary.display()
            )));
        }
    }
    Ok(())
}
