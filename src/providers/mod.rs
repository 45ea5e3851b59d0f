//! Provider module for FinBot
//!
//! This module contains the LLM provider abstraction, the OpenAI and Gemini
//! implementations, and the [`Responder`] that turns a user message into a
//! single assistant reply.

pub mod base;
pub mod gemini;
pub mod openai;

pub use base::{Provider, ProviderKind, APOLOGY_MESSAGE, FINBOT_PERSONA, GEMINI_KEY_PREFIX};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::{FinbotError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Decide which provider a configuration selects
///
/// An explicit `openai` or `gemini` type wins; `auto` looks at the key
/// prefix.
///
/// # Errors
///
/// Returns `MissingCredentials` when no non-empty API key is configured and
/// `Config` for an unknown provider type
///
/// # Examples
///
/// ```
/// use finbot::config::ProviderConfig;
/// use finbot::providers::{resolve_provider_kind, ProviderKind};
///
/// let config = ProviderConfig {
///     api_key: Some("AIzaSyExample".to_string()),
///     ..ProviderConfig::default()
/// };
/// assert_eq!(resolve_provider_kind(&config).unwrap(), ProviderKind::Gemini);
/// ```
pub fn resolve_provider_kind(config: &ProviderConfig) -> Result<ProviderKind> {
    let api_key = configured_key(config)?;
    let explicit = ProviderKind::parse_str(&config.provider_type).map_err(FinbotError::Config)?;
    Ok(explicit.unwrap_or_else(|| ProviderKind::from_credential(api_key)))
}

/// Create a provider instance based on configuration
///
/// # Errors
///
/// Returns error if no credential is configured, the provider type is
/// invalid, or initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    let kind = resolve_provider_kind(config)?;
    let api_key = configured_key(config)?;

    match kind {
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::new(
            config.openai.clone(),
            api_key,
            config.timeout_seconds,
        )?)),
        ProviderKind::Gemini => Ok(Box::new(GeminiProvider::new(
            config.gemini.clone(),
            api_key,
            config.timeout_seconds,
        )?)),
    }
}

fn configured_key(config: &ProviderConfig) -> Result<&str> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(FinbotError::MissingCredentials("no API key configured".to_string()).into()),
    }
}

/// Produces exactly one assistant reply per user message
///
/// Failures of any kind are reported to the user as [`APOLOGY_MESSAGE`].
/// Only one request may be outstanding at a time; the busy flag is held by
/// an [`InFlight`] guard and released when it drops.
pub struct Responder {
    provider: Option<Box<dyn Provider>>,
    busy: AtomicBool,
}

/// Guard for a reserved request slot on a [`Responder`]
pub struct InFlight<'a> {
    responder: &'a Responder,
}

impl Responder {
    /// Create a responder backed by `provider`
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider: Some(provider),
            busy: AtomicBool::new(false),
        }
    }

    /// Create a responder with no credential
    ///
    /// Every reply is the apology and no network call is made.
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            busy: AtomicBool::new(false),
        }
    }

    /// Build a responder from configuration
    ///
    /// A missing or unusable credential is not fatal: the responder falls
    /// back to [`Responder::unconfigured`] and logs why.
    pub fn from_config(config: &ProviderConfig) -> Self {
        match create_provider(config) {
            Ok(provider) => {
                tracing::info!(
                    provider = %provider.kind(),
                    model = provider.model(),
                    "Responder ready"
                );
                Self::new(provider)
            }
            Err(e) => {
                tracing::warn!("No usable LLM provider, replies will be apologies: {}", e);
                Self::unconfigured()
            }
        }
    }

    /// Provider in use, if any
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        self.provider.as_ref().map(|p| p.kind())
    }

    /// Whether a request is currently outstanding
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Reserve the request slot
    ///
    /// Returns `None` while another request is outstanding.
    pub fn try_begin(&self) -> Option<InFlight<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight { responder: self })
    }

    /// Reserve the slot and answer `user_text`
    ///
    /// # Errors
    ///
    /// Returns `FinbotError::Busy` if a request is already outstanding.
    /// Provider failures are not errors; they yield the apology.
    pub async fn respond(&self, user_text: &str) -> Result<String> {
        let in_flight = self.try_begin().ok_or(FinbotError::Busy)?;
        Ok(in_flight.reply(user_text).await)
    }

    async fn reply_or_apology(&self, user_text: &str) -> String {
        let Some(provider) = self.provider.as_ref() else {
            tracing::debug!("No API key configured, skipping request");
            return APOLOGY_MESSAGE.to_string();
        };

        match provider.complete(user_text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(provider = %provider.kind(), "Error calling LLM API: {:#}", e);
                APOLOGY_MESSAGE.to_string()
            }
        }
    }
}

impl InFlight<'_> {
    /// Send the request and return the reply text or the apology
    pub async fn reply(&self, user_text: &str) -> String {
        self.responder.reply_or_apology(user_text).await
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.responder.busy.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Provider for CountingProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        fn model(&self) -> &str {
            "counting"
        }

        async fn complete(&self, user_text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FinbotError::Provider("boom".to_string()).into())
            } else {
                Ok(format!("echo: {}", user_text))
            }
        }
    }

    fn config_with_key(key: Option<&str>, provider_type: &str) -> ProviderConfig {
        ProviderConfig {
            provider_type: provider_type.to_string(),
            api_key: key.map(String::from),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_resolve_auto_uses_key_prefix() {
        let kind = resolve_provider_kind(&config_with_key(Some("AIzaSyABC"), "auto")).unwrap();
        assert_eq!(kind, ProviderKind::Gemini);

        let kind = resolve_provider_kind(&config_with_key(Some("sk-abc"), "auto")).unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
    }

    #[test]
    fn test_resolve_explicit_type_overrides_prefix() {
        let kind = resolve_provider_kind(&config_with_key(Some("AIzaSyABC"), "openai")).unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
    }

    #[test]
    fn test_resolve_without_key_is_missing_credentials() {
        for key in [None, Some(""), Some("   ")] {
            let err = resolve_provider_kind(&config_with_key(key, "auto")).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FinbotError>(),
                Some(FinbotError::MissingCredentials(_))
            ));
        }
    }

    #[test]
    fn test_create_provider_builds_matching_kind() {
        let provider = create_provider(&config_with_key(Some("AIzaSyABC"), "auto")).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Gemini);
        assert_eq!(provider.model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_from_config_without_key_is_unconfigured() {
        let responder = Responder::from_config(&config_with_key(None, "auto"));
        assert!(responder.provider_kind().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_responder_apologizes() {
        let responder = Responder::unconfigured();
        let reply = responder.respond("Hello").await.unwrap();
        assert_eq!(reply, APOLOGY_MESSAGE);
        assert!(!responder.is_busy());
    }

    #[tokio::test]
    async fn test_provider_failure_yields_apology() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responder = Responder::new(Box::new(CountingProvider {
            calls: calls.clone(),
            fail: true,
        }));

        let reply = responder.respond("Hello").await.unwrap();
        assert_eq!(reply, APOLOGY_MESSAGE);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_returns_provider_text() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responder = Responder::new(Box::new(CountingProvider {
            calls: calls.clone(),
            fail: false,
        }));

        assert_eq!(responder.respond("hi").await.unwrap(), "echo: hi");
    }

    #[tokio::test]
    async fn test_second_request_is_rejected_while_busy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responder = Responder::new(Box::new(CountingProvider {
            calls: calls.clone(),
            fail: false,
        }));

        let guard = responder.try_begin().unwrap();
        assert!(responder.is_busy());

        let err = responder.respond("second").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FinbotError>(),
            Some(FinbotError::Busy)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        drop(guard);
        assert!(!responder.is_busy());
        assert!(responder.respond("third").await.is_ok());
    }
}
