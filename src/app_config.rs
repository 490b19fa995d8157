use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    pub translation: TranslationConfig,

    /// Batch orchestration config
    #[serde(default)]
    pub batch: BatchConfig,

    /// Word wrap config
    #[serde(default)]
    pub wordwrap: WordWrapConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    /// Local Ollama server
    #[default]
    Ollama,
}

impl TranslationProvider {
    /// Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
        }
    }

    /// Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Service URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    /// Timeout seconds for a single translation call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "ollama".to_string(),
            model: default_ollama_model(),
            endpoint: default_ollama_endpoint(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

/// Translation configuration section
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Active provider
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Provider configurations
    #[serde(default = "default_available_providers")]
    pub available_providers: Vec<ProviderConfig>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: default_available_providers(),
        }
    }
}

impl TranslationConfig {
    /// Get the configuration of the active provider
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }
}

/// Batch orchestration configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Number of concurrent translation workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Number of recent translated exchanges sent as context
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Checkpoint event frequency (completed units)
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            history_window: default_history_window(),
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

/// Word wrap configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WordWrapConfig {
    /// Visual characters per message-window line
    #[serde(default = "default_chars_per_line")]
    pub chars_per_line: usize,

    /// Lines per message box before overflow
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for WordWrapConfig {
    fn default() -> Self {
        Self {
            chars_per_line: default_chars_per_line(),
            max_lines: default_max_lines(),
        }
    }
}

/// Log level for the application
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warn level
    Warn,
    /// Info level (default)
    #[default]
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

fn default_ollama_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

fn default_available_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig::default()]
}

fn default_workers() -> usize {
    2
}

fn default_history_window() -> usize {
    3
}

fn default_checkpoint_interval() -> usize {
    25
}

fn default_chars_per_line() -> usize {
    55
}

fn default_max_lines() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_language: "ja".to_string(),
            target_language: "en".to_string(),
            translation: TranslationConfig::default(),
            batch: BatchConfig::default(),
            wordwrap: WordWrapConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_language.is_empty() {
            return Err(anyhow!("Source language cannot be empty"));
        }
        if self.target_language.is_empty() {
            return Err(anyhow!("Target language cannot be empty"));
        }
        if crate::language_utils::language_codes_match(&self.source_language, &self.target_language)
        {
            return Err(anyhow!("Source and target language must differ"));
        }
        if self.batch.workers == 0 {
            return Err(anyhow!("Worker count must be at least 1"));
        }
        if self.batch.checkpoint_interval == 0 {
            return Err(anyhow!("Checkpoint interval must be at least 1"));
        }
        if self.wordwrap.chars_per_line < 10 {
            return Err(anyhow!("chars_per_line must be at least 10"));
        }
        let provider_config = self
            .translation
            .get_active_provider_config()
            .ok_or_else(|| anyhow!("No configuration for active provider: {}", self.translation.provider))?;
        if provider_config.model.is_empty() {
            return Err(anyhow!("Provider model cannot be empty"));
        }
        if provider_config.endpoint.is_empty() {
            return Err(anyhow!("Provider endpoint cannot be empty"));
        }
        Ok(())
    }

    /// Default location of the cross-project general glossary file
    pub fn default_general_glossary_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gamemtl")
            .join("general_glossary.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_shouldValidate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_sameLanguages_shouldFail() {
        let mut config = Config::default();
        config.target_language = config.source_language.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_equivalentLanguageCodes_shouldFail() {
        let mut config = Config::default();
        config.source_language = "ja".to_string();
        config.target_language = "jpn".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_zeroWorkers_shouldFail() {
        let mut config = Config::default();
        config.batch.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundTrip_shouldPreserveFields() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.source_language, "ja");
        assert_eq!(parsed.batch.checkpoint_interval, 25);
        assert_eq!(parsed.wordwrap.chars_per_line, 55);
    }

    #[test]
    fn test_translationConfig_getActiveProviderConfig_shouldFindOllama() {
        let config = Config::default();
        let provider = config.translation.get_active_provider_config().unwrap();
        assert_eq!(provider.provider_type, "ollama");
    }
}
