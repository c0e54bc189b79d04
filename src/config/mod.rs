//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments

use crate::input::{
    recovery_action, DecoderError, KeyboardTables, KeymapFile, KeymapSource, LedSet,
    RecoveryAction, RepeatPolicy,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod types;

pub use types::{DecoderConfig, KeymapConfig, LedConfig, LoggingConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Keymap source configuration
    #[serde(default)]
    pub keymap: KeymapConfig,
    /// Initial LED overrides
    #[serde(default)]
    pub leds: LedConfig,
    /// Decoder configuration
    #[serde(default)]
    pub decoder: DecoderConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Self::default_config(),
        }
    }

    /// `$XDG_CONFIG_HOME/keysym-decoder/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("keysym-decoder").join("config.toml"))
    }

    /// Create default configuration
    pub fn default_config() -> Result<Self> {
        Ok(Config {
            keymap: KeymapConfig::default(),
            leds: LedConfig::default(),
            decoder: DecoderConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.keymap.source.as_str() {
            "builtin" | "console" => {}
            "file" => {
                if self.keymap.path.is_none() {
                    anyhow::bail!("keymap.source = \"file\" requires keymap.path");
                }
            }
            _ => anyhow::bail!("Invalid keymap source: {}", self.keymap.source),
        }

        match self.decoder.repeat.as_str() {
            "suppress" | "emit" => {}
            _ => anyhow::bail!("Invalid repeat policy: {}", self.decoder.repeat),
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, keymap: Option<PathBuf>, repeat: Option<String>) -> Self {
        if let Some(path) = keymap {
            self.keymap.source = "file".to_string();
            self.keymap.path = Some(path);
        }

        if let Some(repeat) = repeat {
            self.decoder.repeat = repeat;
        }

        self
    }

    /// Configured auto-repeat policy
    pub fn repeat_policy(&self) -> RepeatPolicy {
        match self.decoder.repeat.as_str() {
            "emit" => RepeatPolicy::Emit,
            _ => RepeatPolicy::Suppress,
        }
    }

    /// Load keyboard tables from the configured source and apply LED overrides
    pub fn load_tables(&self) -> Result<KeyboardTables> {
        let fallback = self.keymap.fallback_to_builtin;

        let mut tables = match self.keymap.source.as_str() {
            "file" => {
                let path = self
                    .keymap
                    .path
                    .as_deref()
                    .context("keymap.path is not set")?;
                tables_from(KeymapFile::load(path), fallback)
                    .context(format!("Failed to load keymap file: {}", path.display()))?
            }
            "console" => self.console_tables(fallback)?,
            _ => KeyboardTables::builtin(),
        };

        self.apply_led_overrides(&mut tables);

        info!(
            "Using keymap with {} pages, {} diacritics",
            tables.keymap.page_count(),
            tables.diacritics.len()
        );
        Ok(tables)
    }

    #[cfg(target_os = "linux")]
    fn console_tables(&self, fallback: bool) -> Result<KeyboardTables> {
        let device = &self.keymap.console_device;
        tables_from(crate::input::ConsoleKeymap::open(device), fallback).context(format!(
            "Failed to read console keymap from {}",
            device.display()
        ))
    }

    #[cfg(not(target_os = "linux"))]
    fn console_tables(&self, fallback: bool) -> Result<KeyboardTables> {
        let error = DecoderError::Console("console keymaps require Linux".to_string());
        tables_from::<KeymapFile>(Err(error), fallback).context("Failed to read console keymap")
    }

    fn apply_led_overrides(&self, tables: &mut KeyboardTables) {
        let overrides = [
            (self.leds.caps_lock, LedSet::CAPS),
            (self.leds.num_lock, LedSet::NUM),
            (self.leds.scroll_lock, LedSet::SCROLL),
        ];

        for (value, flag) in overrides {
            if let Some(on) = value {
                tables.initial.leds.set(flag, on);
            }
        }
    }
}

/// Load tables from an opened source, applying the built-in fallback policy
/// to failures of the open itself as well as of the load
fn tables_from<S: KeymapSource>(
    opened: std::result::Result<S, DecoderError>,
    fallback: bool,
) -> std::result::Result<KeyboardTables, DecoderError> {
    match opened {
        Ok(mut source) => KeyboardTables::load_or_builtin(&mut source, fallback),
        Err(e) => match recovery_action(&e, fallback) {
            RecoveryAction::UseBuiltinKeymap => {
                warn!("Keymap source unavailable: {}, using built-in tables", e);
                Ok(KeyboardTables::builtin())
            }
            RecoveryAction::Abort => Err(e),
        },
    }
}
