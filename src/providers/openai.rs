//! OpenAI provider implementation for FinBot
//!
//! Sends the persona as a system message followed by the user message to the
//! chat completions endpoint and returns the first choice.

use crate::config::OpenAiConfig;
use crate::error::{FinbotError, Result};
use crate::providers::{Provider, ProviderKind, FINBOT_PERSONA};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
}

/// Request body for `/chat/completions`
#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
}

#[derive(Debug, Deserialize)]
struct OpenAiReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use finbot::config::OpenAiConfig;
    /// use finbot::providers::{OpenAiProvider, Provider};
    ///
    /// let provider = OpenAiProvider::new(OpenAiConfig::default(), "sk-test", 30).unwrap();
    /// assert_eq!(provider.model(), "gpt-3.5-turbo");
    /// ```
    pub fn new(config: OpenAiConfig, api_key: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("finbot/0.1.0")
            .build()
            .map_err(|e| FinbotError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, user_text: &'a str) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: &self.config.model,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: FINBOT_PERSONA,
                },
                OpenAiMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, user_text: &str) -> Result<String> {
        let body = self.build_request(user_text);
        tracing::debug!(model = %self.config.model, "Sending OpenAI chat completion request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(FinbotError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FinbotError::Provider(format!(
                "OpenAI API error: {} - {}",
                status.as_u16(),
                error_text
            ))
            .into());
        }

        let parsed: OpenAiResponse = response.json().await.map_err(|e| {
            FinbotError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                FinbotError::Provider("OpenAI response contained no message content".to_string())
                    .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let provider = OpenAiProvider::new(OpenAiConfig::default(), "sk-test", 30).unwrap();
        let body = serde_json::to_value(provider.build_request("How do I budget?")).unwrap();

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], FINBOT_PERSONA);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "How do I budget?");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = OpenAiConfig {
            api_base: "http://localhost:9999/v1/".to_string(),
            ..OpenAiConfig::default()
        };
        let provider = OpenAiProvider::new(config, "sk-test", 30).unwrap();
        assert_eq!(
            provider.endpoint(),
            "http://localhost:9999/v1/chat/completions"
        );
    }

    #[test]
    fn test_response_parsing_extracts_first_choice() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Save 20%."}}]}"#;
        let parsed: OpenAiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Save 20%.")
        );
    }
}
