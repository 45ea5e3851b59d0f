//! Google Gemini provider implementation for FinBot
//!
//! Gemini has no separate system role in the simple generateContent shape,
//! so the persona is prepended to the user text in a single part.

use crate::config::GeminiConfig;
use crate::error::{FinbotError, Result};
use crate::providers::{Provider, ProviderKind, FINBOT_PERSONA};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini generateContent provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: GeminiConfig, api_key: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("finbot/0.1.0")
            .build()
            .map_err(|e| FinbotError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Using Gemini API with model: {}", config.model);

        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request(user_text: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(format!("{}\n\nUser: {}", FINBOT_PERSONA, user_text)),
                }],
            }],
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, user_text: &str) -> Result<String> {
        let body = Self::build_request(user_text);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(FinbotError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API error response: {}", error_text);
            return Err(FinbotError::Provider(format!(
                "Gemini API error: {} - {}",
                status.as_u16(),
                error_text
            ))
            .into());
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            FinbotError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                FinbotError::Provider("Gemini response contained no candidate text".to_string())
                    .into()
            })
    }
}
