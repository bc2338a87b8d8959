//! CLI configuration file support
//!
//! Loads configuration from ~/.config/horizon/config.toml

use anyhow::{Result, bail};
use horizon_ai::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cli::Cli;

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Completions endpoint settings
    #[serde(default)]
    pub provider: ProviderSection,
    /// API key settings
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSection {
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    /// Key used when neither --api-key nor HORIZON_API_KEY is set
    pub default: Option<String>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path. A missing or unreadable file
    /// yields the defaults.
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("Warning: ignoring invalid config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("horizon").join("config.toml"))
    }

    /// Resolve the provider settings. Flags and env vars win over the file,
    /// the file wins over built-in defaults.
    pub fn provider_config(&self, cli: &Cli) -> Result<ProviderConfig> {
        let api_key = cli
            .api_key
            .as_deref()
            .or(self.api_keys.default.as_deref())
            .map(str::trim)
            .filter(|key| !key.is_empty());
        let Some(api_key) = api_key else {
            bail!("API key not found");
        };

        let mut config = ProviderConfig::new(api_key);
        if let Some(url) = cli.api_url.as_ref().or(self.provider.api_url.as_ref()) {
            config = config.with_api_url(url.clone());
        }
        if let Some(model) = cli.model.as_ref().or(self.provider.model.as_ref()) {
            config = config.with_model(model.clone());
        }
        if let Some(temperature) = self.provider.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.provider.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }

        config.validate()?;
        Ok(config)
    }
}
