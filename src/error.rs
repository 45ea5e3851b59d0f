//! Error types for FinBot
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for FinBot operations
///
/// Covers configuration loading, provider calls, local persistence,
/// and the auth client. None of these are fatal to a chat session: the
/// session layer turns them into conversational status messages.
#[derive(Error, Debug)]
pub enum FinbotError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (HTTP status, unexpected response shape)
    #[error("Provider error: {0}")]
    Provider(String),

    /// No API key was configured for the LLM provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// A request is already in flight for this responder
    #[error("A response is already being generated")]
    Busy,

    /// Local record store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Auth backend errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Client-side form validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite errors from the on-disk record store
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for FinBot operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
