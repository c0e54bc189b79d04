//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Keymap source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeymapConfig {
    /// Where the tables come from ("builtin", "file", "console")
    #[serde(default = "default_source")]
    pub source: String,

    /// Keymap file path (required when source is "file")
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Console device to read the kernel keymap from
    #[serde(default = "default_console_device")]
    pub console_device: PathBuf,

    /// Use the built-in US tables if the configured source fails
    #[serde(default = "default_true")]
    pub fallback_to_builtin: bool,
}

impl Default for KeymapConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            path: None,
            console_device: default_console_device(),
            fallback_to_builtin: true,
        }
    }
}

fn default_source() -> String {
    "builtin".to_string()
}

fn default_console_device() -> PathBuf {
    PathBuf::from("/dev/tty")
}

fn default_true() -> bool {
    true
}

/// Initial LED overrides; unset fields keep the keymap source's value
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LedConfig {
    /// Caps lock at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caps_lock: Option<bool>,

    /// Num lock at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_lock: Option<bool>,

    /// Scroll lock at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_lock: Option<bool>,
}

/// Decoder behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Auto-repeat handling ("suppress", "emit")
    /// Default: "suppress" (repeats produce no text)
    #[serde(default = "default_repeat")]
    pub repeat: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            repeat: default_repeat(),
        }
    }
}

fn default_repeat() -> String {
    "suppress".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format ("pretty", "compact", "json")
    #[serde(default = "default_format")]
    pub format: String,

    /// Log file (None = stderr only)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            file: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "compact".to_string()
}
