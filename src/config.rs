//! Configuration management for reqscan

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;
use crate::error::{ReqscanError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// General configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Number of parallel jobs
    pub jobs: Option<usize>,
    /// Reject malformed lines instead of skipping them
    pub strict: bool,
}

/// Analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Report requirements that are not pinned with `==`
    pub require_pins: bool,
    /// Jaro-Winkler score above which two names are reported as similar
    pub similarity_threshold: f64,
    /// Accept plain `http://` index URLs without a warning
    pub allow_http_index: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default format for `fmt` (requirements, json, toml)
    pub default_format: String,
    /// Enable colored output
    pub color: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            require_pins: false,
            similarity_threshold: 0.93,
            allow_http_index: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "requirements".to_string(),
            color: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ReqscanError::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("reqscan").join("config.toml"))
    }

    /// Load configuration from a file, falling back to defaults if it is absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::debug!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Initialize a configuration file with defaults
    pub fn init_at(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(ReqscanError::Config(
                "Configuration file already exists. Use --force to overwrite.".into(),
            ));
        }

        Self::default().save_to(path)
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "general.jobs" => self.general.jobs.map(|j| j.to_string()),
            "general.strict" => Some(self.general.strict.to_string()),

            "analysis.require_pins" => Some(self.analysis.require_pins.to_string()),
            "analysis.similarity_threshold" => Some(self.analysis.similarity_threshold.to_string()),
            "analysis.allow_http_index" => Some(self.analysis.allow_http_index.to_string()),

            "output.default_format" => Some(self.output.default_format.clone()),
            "output.color" => Some(self.output.color.to_string()),

            "logging.level" => Some(self.logging.level.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "general.jobs" => {
                self.general.jobs = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        ReqscanError::Config("Invalid number for jobs".into())
                    })?)
                };
            }
            "general.strict" => {
                self.general.strict = parse_bool(key, value)?;
            }

            "analysis.require_pins" => {
                self.analysis.require_pins = parse_bool(key, value)?;
            }
            "analysis.similarity_threshold" => {
                let threshold: f64 = value.parse().map_err(|_| {
                    ReqscanError::Config("Invalid number for similarity_threshold".into())
                })?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(ReqscanError::Config(
                        "similarity_threshold must be between 0 and 1".into(),
                    ));
                }
                self.analysis.similarity_threshold = threshold;
            }
            "analysis.allow_http_index" => {
                self.analysis.allow_http_index = parse_bool(key, value)?;
            }

            "output.default_format" => {
                let format = OutputFormat::from_name(value).ok_or_else(|| {
                    ReqscanError::Config(format!("Unknown output format: {}", value))
                })?;
                self.output.default_format = format.name().to_string();
            }
            "output.color" => {
                self.output.color = parse_bool(key, value)?;
            }

            "logging.level" => {
                self.logging.level = value.to_string();
            }

            _ => {
                return Err(ReqscanError::Config(format!("Unknown configuration key: {}", key)));
            }
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| ReqscanError::Config(format!("Invalid boolean for {}", key)))
}
