//! FinBot - AI financial assistant library
//!
//! This library provides the core functionality behind the FinBot chat CLI:
//! a chat session with slash commands and debounced autosave, local
//! persistence of saved chats, and LLM providers that answer as a financial
//! assistant.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Active chat state, command handling, and autosave
//! - `storage`: Record store backends and the saved-chat catalog
//! - `providers`: OpenAI and Gemini clients plus the single-flight responder
//! - `auth`: Client for the account backend and the stored login
//! - `commands`: CLI command handlers and the slash command parser
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use finbot::{ChatSession, Config, Responder};
//! use finbot::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let session = ChatSession::for_user(
//!         "ada@example.com",
//!         &config.chat,
//!         Arc::new(SqliteStorage::new()?),
//!         Arc::new(Responder::from_config(&config.provider)),
//!     );
//!     session.submit("How much should I keep in an emergency fund?").await;
//!     session.flush();
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{FinbotError, Result};
pub use providers::{Provider, ProviderKind, Responder};
pub use session::{ChatSession, Submission};
