//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pregrant.toml` files.

use crate::agent::EvaluatorConfig;
use crate::history::{FileStore, DEFAULT_HISTORY_KEY};
use crate::models::DetailLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".pregrant.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Evaluator model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// History settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory exported reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            verbose: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Evaluator model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let evaluator = EvaluatorConfig::default();
        Self {
            api_url: evaluator.api_url,
            name: evaluator.model_name,
            temperature: evaluator.temperature,
            max_tokens: evaluator.max_tokens,
            timeout_seconds: evaluator.timeout_seconds,
            api_key_env: evaluator.api_key_env,
        }
    }
}

fn default_api_url() -> String {
    EvaluatorConfig::default().api_url
}

fn default_model() -> String {
    EvaluatorConfig::default().model_name
}

fn default_temperature() -> f32 {
    EvaluatorConfig::default().temperature
}

fn default_max_tokens() -> u32 {
    EvaluatorConfig::default().max_tokens
}

fn default_timeout() -> u64 {
    EvaluatorConfig::default().timeout_seconds
}

fn default_api_key_env() -> String {
    EvaluatorConfig::default().api_key_env
}

/// History persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Directory holding the history file. Defaults to `~/.pregrant/history`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Key the history is stored under.
    #[serde(default = "default_history_key")]
    pub key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: None,
            key: default_history_key(),
        }
    }
}

fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Depth of the generated narrative.
    #[serde(default)]
    pub detail: DetailLevel,

    /// Title printed in the banner and footers.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            detail: DetailLevel::default(),
            title: default_title(),
        }
    }
}

fn default_title() -> String {
    "PreGrant Evaluation Report".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from `dir/.pregrant.toml`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Resolve the active configuration: an explicit file, then
    /// `./.pregrant.toml`, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading config from: {}", path.display());
            return Self::load(path);
        }

        match Self::load_from_dir(Path::new("."))? {
            Some(config) => {
                info!("Loaded default config from {}", CONFIG_FILE_NAME);
                Ok(config)
            }
            None => {
                debug!("No config file found, using defaults");
                Ok(Config::default())
            }
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref api_url) = args.api_url {
            self.model.api_url = api_url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref dir) = args.history_dir {
            self.history.dir = Some(dir.clone());
        }

        if let Some(detail) = args.detail {
            self.report.detail = detail;
        }
        if let Some(ref title) = args.title {
            self.report.title = title.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Directory the history file lives in.
    pub fn history_dir(&self) -> PathBuf {
        self.history.dir.clone().unwrap_or_else(FileStore::default_dir)
    }

    /// Client settings, with the API key read from the configured
    /// environment variable.
    pub fn evaluator_config(&self) -> EvaluatorConfig {
        let api_key = std::env::var(&self.model.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        EvaluatorConfig {
            api_url: self.model.api_url.clone(),
            model_name: self.model.name.clone(),
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
            timeout_seconds: self.model.timeout_seconds,
            api_key,
            api_key_env: self.model.api_key_env.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")
    }
}
