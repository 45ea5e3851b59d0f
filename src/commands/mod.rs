/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three groups of commands:

- `chat`     - Interactive FinBot chat session
- `history`  - List and delete saved chats outside a session
- `account`  - Login, signup and profile management against the auth backend
*/

use crate::auth::TokenStore;
use crate::error::{FinbotError, Result};
use crate::storage::{MemoryStorage, RecordStore, SqliteStorage};
use std::sync::Arc;

// Slash command parser for the chat loop
pub mod special_commands;

// Saved-chat management commands
pub mod history;

// Auth backend commands
pub mod account;

/// Open the on-disk record store
///
/// Uses `storage_path` when given, otherwise the default location (which
/// also honours `FINBOT_STORAGE_DB`).
///
/// # Errors
///
/// Returns error if the database cannot be opened or initialized
pub fn open_record_store(storage_path: Option<&str>) -> Result<Arc<dyn RecordStore>> {
    let storage = match storage_path {
        Some(path) => SqliteStorage::new_with_path(path)?,
        None => SqliteStorage::new()?,
    };
    tracing::debug!("Using record store at {}", storage.db_path().display());
    Ok(Arc::new(storage))
}

/// Open the on-disk record store, or fall back to memory
///
/// Chat sessions stay usable without persistence; the user is warned that
/// nothing will be kept.
pub fn open_record_store_or_memory(storage_path: Option<&str>) -> Arc<dyn RecordStore> {
    match open_record_store(storage_path) {
        Ok(store) => store,
        Err(e) => {
            use colored::Colorize;
            tracing::error!("Failed to open local storage: {:#}", e);
            eprintln!(
                "{}",
                "Warning: local storage is unavailable; chats will not be saved.".yellow()
            );
            Arc::new(MemoryStorage::new())
        }
    }
}

/// Pick whose chats to use: an explicit email or the logged-in user
///
/// # Errors
///
/// Returns `Validation` for a malformed explicit email and `Auth` when no
/// email is given and nobody is logged in
pub fn resolve_user_email(explicit: Option<&str>, tokens: &TokenStore) -> Result<String> {
    if let Some(email) = explicit {
        if let Some(message) = crate::auth::validate_email(email) {
            return Err(FinbotError::Validation(message).into());
        }
        return Ok(email.to_string());
    }

    tokens.current_user().map(|user| user.email).ok_or_else(|| {
        FinbotError::Auth(
            "No user specified. Pass --user <email> or run `finbot login` first.".to_string(),
        )
        .into()
    })
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Builds the responder and session for the selected user and runs a
    //! readline-based loop that feeds each line to the session.

    use super::*;
    use crate::config::Config;
    use crate::providers::Responder;
    use crate::session::{ChatSession, SaveOutcome, Submission};
    use crate::storage::{CatalogStore, ChatMessage, Role};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    use super::special_commands::is_exit_command;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `storage_path` - Optional record store location
    /// * `user` - Optional email; defaults to the logged-in user
    ///
    /// # Errors
    ///
    /// Returns error if no user can be determined or the terminal cannot be
    /// opened
    pub async fn run_chat(
        config: Config,
        storage_path: Option<String>,
        user: Option<String>,
    ) -> Result<()> {
        let records = open_record_store_or_memory(storage_path.as_deref());
        let tokens = TokenStore::new(records.clone());
        let email = resolve_user_email(user.as_deref(), &tokens)?;
        let display_name = tokens
            .current_user()
            .filter(|u| u.email == email && !u.name.is_empty())
            .map(|u| u.name)
            .unwrap_or_else(|| email.clone());

        let responder = Arc::new(Responder::from_config(&config.provider));
        if responder.provider_kind().is_none() {
            eprintln!(
                "{}",
                "No API key configured. Set FINBOT_API_KEY (or OPENAI_API_KEY / GEMINI_API_KEY) to get answers."
                    .yellow()
            );
        }

        let store: Arc<dyn CatalogStore> = Arc::new(records);
        let session = ChatSession::for_user(&email, &config.chat, store, responder);

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner(&display_name);

        loop {
            let prompt = format!("{} ", "you>".bold().blue());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if is_exit_command(trimmed) {
                        break;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    let mark = session.mark();
                    if !trimmed.starts_with('/') {
                        println!("{}", "FinBot is typing...".dimmed());
                    }

                    match session.submit(trimmed).await {
                        Submission::Replied(reply) => print_assistant(&reply),
                        Submission::Busy => {
                            println!("{}", "FinBot is still answering, please wait.".yellow());
                        }
                        Submission::Ignored => {}
                        Submission::Command | Submission::UnknownCommand => {
                            for message in session.messages_since(mark) {
                                print_message(&message);
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        if let SaveOutcome::NotPersisted(e) = session.flush() {
            eprintln!("{}", format!("Warning: final save failed: {}", e).red());
        }
        session.shutdown();

        println!("Goodbye!");
        Ok(())
    }

    fn print_assistant(text: &str) {
        println!("\n{} {}\n", "FinBot:".bold().green(), text);
    }

    fn print_message(message: &ChatMessage) {
        match message.role {
            Role::User => println!("{} {}", "You:".bold().blue(), message.content),
            Role::Assistant => print_assistant(&message.content),
        }
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(name: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              FinBot - Your AI Financial Assistant            ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Hello {}! 👋", name.bold());
        println!(
            "I'm here to help you with financial planning, investment advice, budgeting, and market insights.\n"
        );
        println!("Quick commands:");
        println!("  {}            Show all commands", "/help".cyan());
        println!("  {}              Start new chat", "/nc".cyan());
        println!("  {}   Save current chat", "/save \"name\"".cyan());
        println!("  {}            View saved chats", "/list".cyan());
        println!("\nType 'exit' or 'quit' to leave.\n");
    }
}
