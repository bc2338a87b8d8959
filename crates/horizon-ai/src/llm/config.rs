use std::fmt;

use crate::error::{AiError, Result};

pub const DEFAULT_API_URL: &str = "https://api.a4f.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 200_000;

/// Connection settings for an OpenAI-compatible chat completions endpoint.
///
/// Passed to the client at construction; nothing here is process-global.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    /// Full endpoint URL, e.g. `https://host/v1/chat/completions`
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    /// Upper bound on generated tokens sent with every request
    pub max_tokens: u32,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AiError::Config("API key not found".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(AiError::Config("model must not be empty".to_string()));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(AiError::Config(format!(
                "API URL must be http(s): {}",
                self.api_url
            )));
        }
        if self.max_tokens == 0 {
            return Err(AiError::Config("max_tokens must be positive".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
