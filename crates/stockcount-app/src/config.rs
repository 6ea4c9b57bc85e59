//! Configuration management for stockcount
//!
//! Config stored at: ~/.config/stockcount/config.json
//!
//! Environment variables (`STOCKCOUNT_*`) override the file; CLI flags
//! override both.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stockcount_types::{ConfigError, DevicePreference, OutputFormat, Result};

pub const ENV_API_KEY: &str = "STOCKCOUNT_API_KEY";
pub const ENV_BASE_URL: &str = "STOCKCOUNT_BASE_URL";
pub const ENV_MODEL: &str = "STOCKCOUNT_MODEL";
pub const ENV_OCR_URL: &str = "STOCKCOUNT_OCR_URL";
pub const ENV_DEVICE: &str = "STOCKCOUNT_DEVICE";
pub const ENV_OCR_LANG: &str = "STOCKCOUNT_OCR_LANG";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API key for the completion service
    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL of the completion service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every completion request
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for completion and OCR requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base URL of the OCR service
    #[serde(default = "default_ocr_url")]
    pub ocr_url: String,

    /// OCR device (auto, gpu, cpu)
    #[serde(default)]
    pub device: DevicePreference,

    /// Recognition language of the OCR model
    #[serde(default = "default_ocr_lang")]
    pub ocr_lang: String,

    /// Longer-side ceiling applied before recognition
    #[serde(default = "default_max_side")]
    pub max_side: u32,

    /// Default output format (json, table)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

fn default_base_url() -> String {
    "https://ark.cn-beijing.volces.com/api/v3".to_string()
}

fn default_model() -> String {
    "doubao-seed-1-6-vision-250815".to_string()
}

fn default_temperature() -> f32 {
    stockcount_vision::DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    stockcount_vision::DEFAULT_MAX_TOKENS
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_ocr_url() -> String {
    "http://127.0.0.1:8866".to_string()
}

fn default_ocr_lang() -> String {
    stockcount_vision::DEFAULT_LANG.to_string()
}

fn default_max_side() -> u32 {
    stockcount_vision::DEFAULT_MAX_SIDE
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Table
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            ocr_url: default_ocr_url(),
            device: DevicePreference::default(),
            ocr_lang: default_ocr_lang(),
            max_side: default_max_side(),
            output_format: default_output_format(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("stockcount");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from file and apply `STOCKCOUNT_*` environment overrides
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content).map_err(|e| {
                ConfigError::ParseError(format!("{}: {}", path.display(), e))
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = get(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(base_url) = get(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.model = model;
        }
        if let Some(ocr_url) = get(ENV_OCR_URL) {
            self.ocr_url = ocr_url;
        }
        if let Some(ocr_lang) = get(ENV_OCR_LANG) {
            self.ocr_lang = ocr_lang;
        }
        if let Some(device) = get(ENV_DEVICE) {
            self.device = device
                .parse()
                .map_err(|e: String| ConfigError::InvalidValue(format!("{}: {}", ENV_DEVICE, e)))?;
        }
        Ok(())
    }

    /// The API key, or an error explaining how to set one
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey.into()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        match self.api_key.as_deref() {
            None | Some("") => "(not set)".to_string(),
            Some(key) => {
                let chars: Vec<char> = key.chars().collect();
                if chars.len() <= 4 {
                    "****".to_string()
                } else {
                    let tail: String = chars[chars.len() - 4..].iter().collect();
                    format!("****{}", tail)
                }
            }
        }
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Stockcount Configuration")?;
        writeln!(f, "========================")?;
        writeln!(f)?;
        writeln!(f, "API key:        {}", self.masked_api_key())?;
        writeln!(f, "Base URL:       {}", self.base_url)?;
        writeln!(f, "Model:          {}", self.model)?;
        writeln!(f, "Temperature:    {}", self.temperature)?;
        writeln!(f, "Max tokens:     {}", self.max_tokens)?;
        writeln!(f, "Timeout:        {}s", self.request_timeout_secs)?;
        writeln!(f, "OCR URL:        {}", self.ocr_url)?;
        writeln!(f, "OCR device:     {}", self.device)?;
        writeln!(f, "OCR language:   {}", self.ocr_lang)?;
        writeln!(f, "Max side:       {}px", self.max_side)?;
        writeln!(f, "Output format:  {}", self.output_format)?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:    {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use stockcount_types::Error;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model, "doubao-seed-1-6-vision-250815");
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.max_side, 2500);
        assert_eq!(config.device, DevicePreference::Auto);
        assert_eq!(config.ocr_lang, "ch");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.api_key = Some("sk-test-1234".to_string());
        config.device = DevicePreference::Cpu;
        config.output_format = OutputFormat::Json;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"model": "custom-model", "device": "gpu"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "custom-model");
        assert_eq!(config.device, DevicePreference::Gpu);
        assert_eq!(config.ocr_url, default_ocr_url());
        assert_eq!(config.ocr_lang, default_ocr_lang());
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(Error::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, "sk-env"),
            (ENV_MODEL, "env-model"),
            (ENV_DEVICE, "cpu"),
            (ENV_OCR_LANG, "en"),
            (ENV_BASE_URL, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.model, "env-model");
        assert_eq!(config.device, DevicePreference::Cpu);
        assert_eq!(config.ocr_lang, "en");
        assert_eq!(config.base_url, default_base_url());
    }

    #[test]
    fn test_invalid_device_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == ENV_DEVICE).then(|| "tpu".to_string())
        });
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue(_)))
        ));
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::default();
        assert!(matches!(
            config.require_api_key(),
            Err(Error::Config(ConfigError::MissingApiKey))
        ));

        config.api_key = Some("sk-abc".to_string());
        assert_eq!(config.require_api_key().unwrap(), "sk-abc");
    }

    #[test]
    fn test_display_masks_api_key() {
        let mut config = Config::default();
        config.api_key = Some("sk-secret-value-9876".to_string());

        let shown = config.to_string();
        assert!(shown.contains("****9876"));
        assert!(!shown.contains("secret"));
    }
}
