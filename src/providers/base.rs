//! Base provider trait and shared constants for FinBot
//!
//! This module defines the Provider trait that the OpenAI and Gemini
//! clients implement, the provider selection enum, and the fixed persona
//! and apology texts.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Prefix that identifies a Google Gemini API key
pub const GEMINI_KEY_PREFIX: &str = "AIzaSy";

/// System instruction sent with every request
pub const FINBOT_PERSONA: &str = "You are FinBot, an AI-powered financial assistant. You help users with budgeting, investment advice, financial planning, and market insights. Always be helpful, professional, and provide practical financial guidance. You are an expert in personal finance and investments with deep knowledge of financial markets, instruments, and strategies as well as budgeting and saving techniques with a friendly and approachable demeanor along with clear and concise explanations.";

/// Reply used whenever a provider cannot produce an answer
pub const APOLOGY_MESSAGE: &str = "I apologize, but I'm currently experiencing technical difficulties. Please try again later or check your API configuration.";

/// Which LLM API a credential is used against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// Google Gemini generateContent
    Gemini,
}

impl ProviderKind {
    /// Infer the provider from the shape of an API key
    ///
    /// Keys starting with [`GEMINI_KEY_PREFIX`] belong to Gemini; anything
    /// else is treated as an OpenAI key.
    ///
    /// # Examples
    ///
    /// ```
    /// use finbot::providers::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::from_credential("AIzaSyABC"), ProviderKind::Gemini);
    /// assert_eq!(ProviderKind::from_credential("sk-abc"), ProviderKind::OpenAi);
    /// ```
    pub fn from_credential(api_key: &str) -> Self {
        if api_key.starts_with(GEMINI_KEY_PREFIX) {
            Self::Gemini
        } else {
            Self::OpenAi
        }
    }

    /// Parse an explicit provider name
    ///
    /// Returns `None` for `auto`, meaning the key decides.
    pub fn parse_str(s: &str) -> std::result::Result<Option<Self>, String> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(None),
            "openai" => Ok(Some(Self::OpenAi)),
            "gemini" => Ok(Some(Self::Gemini)),
            other => Err(format!("Unknown provider type: {}", other)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// An LLM backend able to answer a single user message
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which API this provider talks to
    fn kind(&self) -> ProviderKind;

    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Send `user_text` with the FinBot persona and return the reply text
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-success status, or a
    /// response without reply text
    async fn complete(&self, user_text: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_credential_detects_gemini_prefix() {
        assert_eq!(
            ProviderKind::from_credential("AIzaSyD-some-key"),
            ProviderKind::Gemini
        );
    }

    #[test]
    fn test_from_credential_defaults_to_openai() {
        assert_eq!(
            ProviderKind::from_credential("sk-proj-123"),
            ProviderKind::OpenAi
        );
        // Prefix match is case-sensitive
        assert_eq!(
            ProviderKind::from_credential("aizasy-lowercase"),
            ProviderKind::OpenAi
        );
    }

    #[test]
    fn test_parse_str() {
        assert_eq!(ProviderKind::parse_str("auto").unwrap(), None);
        assert_eq!(
            ProviderKind::parse_str("OpenAI").unwrap(),
            Some(ProviderKind::OpenAi)
        );
        assert_eq!(
            ProviderKind::parse_str("gemini").unwrap(),
            Some(ProviderKind::Gemini)
        );
        assert!(ProviderKind::parse_str("ollama").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
        assert_eq!(ProviderKind::Gemini.to_string(), "gemini");
    }
}
