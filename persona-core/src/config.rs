//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/persona/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/persona/` (~/.config/persona/)
//! - Data: `$XDG_DATA_HOME/persona/` (~/.local/share/persona/)
//! - State/Logs: `$XDG_STATE_HOME/persona/` (~/.local/state/persona/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Largest accepted message cap.
pub const MAX_MESSAGES_LIMIT: usize = 5000;
/// Largest accepted day window.
pub const MAX_ANALYSIS_DAYS: u32 = 365;

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analysis behavior
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Named model endpoints, referenced by `analysis.analysis_model_group`
    #[serde(default)]
    pub model_groups: HashMap<String, LlmConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM provider configuration for one model group
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider type
    pub provider: LlmProvider,
    /// Model to use
    pub model: String,
    /// API endpoint (optional, uses default for provider)
    pub endpoint: Option<String>,
    /// API key (can also use env var)
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

/// Supported LLM providers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    Claude,
    OpenAI,
}

impl LlmProvider {
    /// Returns the default endpoint for this provider
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::Claude => "https://api.anthropic.com",
            LlmProvider::OpenAI => "https://api.openai.com",
        }
    }
}

/// Personality analysis settings
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Trailing days of history used when the caller does not say
    #[serde(default = "default_analysis_days")]
    pub default_analysis_days: u32,

    /// Message cap used when the caller does not say
    #[serde(default = "default_max_messages")]
    pub default_max_messages: usize,

    /// Fewer messages than this is an insufficient sample
    #[serde(default = "default_min_message_threshold")]
    pub min_message_threshold: usize,

    /// Days a cached report stays fresh
    #[serde(default = "default_cache_expire_days")]
    pub cache_expire_days: u32,

    #[serde(default = "default_true")]
    pub enable_big_five: bool,

    #[serde(default = "default_true")]
    pub enable_mbti: bool,

    #[serde(default = "default_true")]
    pub enable_behavior_pattern: bool,

    /// Model group used for the analysis call; empty means unset
    #[serde(default = "default_model_group")]
    pub analysis_model_group: String,

    /// Output token budget for the model response
    #[serde(default = "default_max_analysis_tokens")]
    pub max_analysis_tokens: u32,

    /// Estimated token budget for the prompt itself
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_analysis_days: default_analysis_days(),
            default_max_messages: default_max_messages(),
            min_message_threshold: default_min_message_threshold(),
            cache_expire_days: default_cache_expire_days(),
            enable_big_five: true,
            enable_mbti: true,
            enable_behavior_pattern: true,
            analysis_model_group: default_model_group(),
            max_analysis_tokens: default_max_analysis_tokens(),
            max_prompt_tokens: default_max_prompt_tokens(),
        }
    }
}

impl AnalysisConfig {
    /// Whether any enabled section needs a model call.
    pub fn needs_model(&self) -> bool {
        self.enable_big_five || self.enable_mbti
    }

    /// Check the feature toggles, the model group and the request defaults.
    pub fn validate(&self) -> Result<()> {
        if !self.needs_model() && !self.enable_behavior_pattern {
            return Err(Error::Config(
                "all analysis sections are disabled; enable at least one of big five, MBTI or behavior patterns"
                    .to_string(),
            ));
        }
        if self.needs_model() && self.analysis_model_group.trim().is_empty() {
            return Err(Error::Config(
                "analysis.analysis_model_group is required when big five or MBTI analysis is enabled"
                    .to_string(),
            ));
        }
        if self.min_message_threshold == 0 {
            return Err(Error::Config(
                "analysis.min_message_threshold must be at least 1".to_string(),
            ));
        }
        if self.cache_expire_days == 0 {
            return Err(Error::Config(
                "analysis.cache_expire_days must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_ANALYSIS_DAYS).contains(&self.default_analysis_days) {
            return Err(Error::Config(format!(
                "analysis.default_analysis_days must be between 1 and {}, got {}",
                MAX_ANALYSIS_DAYS, self.default_analysis_days
            )));
        }
        if !(self.min_message_threshold..=MAX_MESSAGES_LIMIT).contains(&self.default_max_messages) {
            return Err(Error::Config(format!(
                "analysis.default_max_messages must be between {} and {}, got {}",
                self.min_message_threshold, MAX_MESSAGES_LIMIT, self.default_max_messages
            )));
        }
        Ok(())
    }
}

fn default_analysis_days() -> u32 {
    30
}

fn default_max_messages() -> usize {
    500
}

fn default_min_message_threshold() -> usize {
    50
}

fn default_cache_expire_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

fn default_model_group() -> String {
    "default".to_string()
}

fn default_max_analysis_tokens() -> u32 {
    2048
}

fn default_max_prompt_tokens() -> usize {
    6000
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// File rotation: "daily", "hourly" or "never"
    #[serde(default = "default_log_rotation")]
    pub rotation: String,
    /// Also write log lines to stderr
    #[serde(default)]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            rotation: default_log_rotation(),
            stderr: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/persona/config.toml` (~/.config/persona/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("persona").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/persona/` (~/.local/share/persona/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("persona")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/persona/` (~/.local/state/persona/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("persona")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/persona/data.db` (~/.local/share/persona/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("persona.log")
    }
}
