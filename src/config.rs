//! Configuration management for FinBot
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{FinbotError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for FinBot
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration (OpenAI, Gemini)
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Chat session behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// Auth backend settings
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Provider configuration
///
/// `provider_type` is one of `auto`, `openai` or `gemini`. In `auto` mode the
/// provider is picked from the shape of the API key when the responder is
/// built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// API key for the selected provider
    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI chat completions settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Gemini generateContent settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// HTTP client timeout for provider calls (seconds)
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_provider_type() -> String {
    "auto".to_string()
}

fn default_provider_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            api_key: None,
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model to use for chat completions
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API base URL (useful for tests and local mocks)
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// Maximum tokens in the completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_base: default_openai_api_base(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model to use for generateContent
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API base URL (useful for tests and local mocks)
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_base: default_gemini_api_base(),
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Quiet period after the last turn before the chat is autosaved
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Prefix joined with the user's email to form the catalog key
    #[serde(default = "default_storage_key_prefix")]
    pub storage_key_prefix: String,
}

fn default_autosave_delay_ms() -> u64 {
    2000
}

fn default_storage_key_prefix() -> String {
    "finbot-chats-".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: default_autosave_delay_ms(),
            storage_key_prefix: default_storage_key_prefix(),
        }
    }
}

/// Auth backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the auth REST API
    #[serde(default = "default_auth_api_base")]
    pub api_base: String,
}

fn default_auth_api_base() -> String {
    "http://localhost:8081/api".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_base: default_auth_api_base(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed command line, used for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(FinbotError::Io)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(FinbotError::Yaml)?;
        tracing::debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("FINBOT_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        // First key found wins, matching the order users usually set them in
        for var in ["FINBOT_API_KEY", "OPENAI_API_KEY", "GEMINI_API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    tracing::debug!("Env override: API key from {}", var);
                    self.provider.api_key = Some(key);
                    break;
                }
            }
        }

        if let Ok(model) = std::env::var("FINBOT_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(api_base) = std::env::var("FINBOT_OPENAI_API_BASE") {
            self.provider.openai.api_base = api_base;
        }

        if let Ok(model) = std::env::var("FINBOT_GEMINI_MODEL") {
            self.provider.gemini.model = model;
        }

        if let Ok(api_base) = std::env::var("FINBOT_GEMINI_API_BASE") {
            self.provider.gemini.api_base = api_base;
        }

        if let Ok(delay) = std::env::var("FINBOT_AUTOSAVE_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(v) => {
                    self.chat.autosave_delay_ms = v;
                    tracing::debug!(autosave_delay_ms = v, "Env override: FINBOT_AUTOSAVE_DELAY_MS");
                }
                Err(_) => {
                    tracing::warn!("Invalid FINBOT_AUTOSAVE_DELAY_MS: {}", delay);
                }
            }
        }

        if let Ok(api_base) = std::env::var("FINBOT_AUTH_API_BASE") {
            tracing::debug!(api_base = %api_base, "Env override: FINBOT_AUTH_API_BASE");
            self.auth.api_base = api_base;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let crate::cli::Commands::Chat {
            provider: Some(provider),
            ..
        } = &cli.command
        {
            tracing::debug!("CLI override: provider type {}", provider);
            self.provider.provider_type = provider.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range or a required field is empty
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["auto", "openai", "gemini"];
        let provider_type = self.provider.provider_type.trim().to_lowercase();
        if !valid_providers.contains(&provider_type.as_str()) {
            return Err(FinbotError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(FinbotError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.provider.openai.max_tokens == 0 {
            return Err(FinbotError::Config(
                "provider.openai.max_tokens must be greater than 0".to_string(),
            )
            .into());
        }

        if !(0.0..=2.0).contains(&self.provider.openai.temperature) {
            return Err(FinbotError::Config(
                "provider.openai.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if self.chat.storage_key_prefix.is_empty() {
            return Err(FinbotError::Config(
                "chat.storage_key_prefix cannot be empty".to_string(),
            )
            .into());
        }

        if self.auth.api_base.trim().is_empty() {
            return Err(
                FinbotError::Config("auth.api_base cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        for var in [
            "FINBOT_PROVIDER",
            "FINBOT_API_KEY",
            "OPENAI_API_KEY",
            "GEMINI_API_KEY",
            "FINBOT_OPENAI_MODEL",
            "FINBOT_OPENAI_API_BASE",
            "FINBOT_GEMINI_MODEL",
            "FINBOT_GEMINI_API_BASE",
            "FINBOT_AUTOSAVE_DELAY_MS",
            "FINBOT_AUTH_API_BASE",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "auto");
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.provider.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.provider.openai.max_tokens, 500);
        assert_eq!(config.provider.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.chat.autosave_delay_ms, 2000);
        assert_eq!(config.chat.storage_key_prefix, "finbot-chats-");
        assert_eq!(config.auth.api_base, "http://localhost:8081/api");
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "anthropic".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid provider type"));
    }

    #[test]
    fn test_config_validation_provider_type_ignores_case() {
        let mut config = Config::default();
        for provider_type in ["OpenAI", "GEMINI", "Auto"] {
            config.provider.provider_type = provider_type.to_string();
            assert!(config.validate().is_ok(), "{} rejected", provider_type);
            assert!(crate::providers::ProviderKind::parse_str(provider_type).is_ok());
        }
    }

    #[test]
    fn test_config_validation_zero_max_tokens() {
        let mut config = Config::default();
        config.provider.openai.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_temperature_out_of_range() {
        let mut config = Config::default();
        config.provider.openai.temperature = 2.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_prefix() {
        let mut config = Config::default();
        config.chat.storage_key_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
provider:
  type: gemini
  api_key: AIzaSyTest
  gemini:
    model: gemini-1.5-pro
chat:
  autosave_delay_ms: 500
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.provider_type, "gemini");
        assert_eq!(config.provider.api_key.as_deref(), Some("AIzaSyTest"));
        assert_eq!(config.provider.gemini.model, "gemini-1.5-pro");
        assert_eq!(
            config.provider.gemini.api_base,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(config.chat.autosave_delay_ms, 500);
        assert_eq!(config.chat.storage_key_prefix, "finbot-chats-");
        assert_eq!(config.provider.openai.model, "gpt-3.5-turbo");
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        clear_env();
        let cli = crate::cli::Cli::default();
        let config = Config::load("/nonexistent/finbot.yaml", &cli).unwrap();
        assert_eq!(config.provider.provider_type, "auto");
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_fields() {
        clear_env();
        env::set_var("FINBOT_PROVIDER", "openai");
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("FINBOT_OPENAI_MODEL", "gpt-4o-mini");
        env::set_var("FINBOT_AUTOSAVE_DELAY_MS", "750");
        env::set_var("FINBOT_AUTH_API_BASE", "http://auth.local/api");

        let mut config = Config::default();
        config.apply_env_vars();
        clear_env();

        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.provider.openai.model, "gpt-4o-mini");
        assert_eq!(config.chat.autosave_delay_ms, 750);
        assert_eq!(config.auth.api_base, "http://auth.local/api");
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_prefers_finbot_api_key() {
        clear_env();
        env::set_var("FINBOT_API_KEY", "AIzaSyPreferred");
        env::set_var("OPENAI_API_KEY", "sk-ignored");

        let mut config = Config::default();
        config.apply_env_vars();
        clear_env();

        assert_eq!(config.provider.api_key.as_deref(), Some("AIzaSyPreferred"));
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_ignores_invalid_delay() {
        clear_env();
        env::set_var("FINBOT_AUTOSAVE_DELAY_MS", "soon");

        let mut config = Config::default();
        config.apply_env_vars();
        clear_env();

        assert_eq!(config.chat.autosave_delay_ms, 2000);
    }

    #[test]
    #[serial]
    fn test_cli_provider_override() {
        clear_env();
        let cli = crate::cli::Cli {
            command: crate::cli::Commands::Chat {
                user: None,
                provider: Some("gemini".to_string()),
            },
            ..crate::cli::Cli::default()
        };
        let config = Config::load("/nonexistent/finbot.yaml", &cli).unwrap();
        assert_eq!(config.provider.provider_type, "gemini");
    }
}
