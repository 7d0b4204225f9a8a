//! Configuration file handling.
//!
//! Settings are read from an optional `gss_dashboard.toml` in the working
//! directory. Every field falls back to the built-in survey constants.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "gss_dashboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Native window settings.
    #[serde(default)]
    pub window: WindowConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Maximum tracing level: trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the survey extract comes from and how to parse it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Remote URL or local path of the CSV extract.
    #[serde(default = "default_location")]
    pub location: String,

    /// Character encoding label (WHATWG names, e.g. "cp1252", "utf-8").
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Placeholder strings that mean "no answer".
    #[serde(default = "default_na_values")]
    pub na_values: Vec<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            encoding: default_encoding(),
            na_values: default_na_values(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_location() -> String {
    "https://github.com/jkropko/DS-6001/raw/master/localdata/gss2018.csv".to_string()
}

fn default_encoding() -> String {
    "cp1252".to_string()
}

fn default_na_values() -> Vec<String> {
    vec![
        "IAP",
        "IAP,DK,NA,uncodeable",
        "NOT SURE",
        "DK",
        "IAP, DK, NA, uncodeable",
        ".a",
        "CAN'T CHOOSE",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_timeout() -> u64 {
    120
}

/// Native window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: f32,

    #[serde(default = "default_height")]
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_width() -> f32 {
    1400.0
}

fn default_height() -> f32 {
    900.0
}

impl DashboardConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: DashboardConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `gss_dashboard.toml` from the working directory, or defaults if absent.
    pub fn load_default() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Map the configured level name onto a tracing level.
    pub fn log_level(&self) -> tracing::Level {
        match self.general.log_level.to_ascii_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }
}
