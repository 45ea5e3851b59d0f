//! Command-line interface definition for FinBot
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chat, saved-chat history, and account management.

use clap::{Parser, Subcommand};

/// FinBot - AI-powered financial assistant in your terminal
///
/// Chat with an LLM-backed financial assistant, keep named chats per user,
/// and manage your FinBot account.
#[derive(Parser, Debug, Clone)]
#[command(name = "finbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the local storage database path
    #[arg(long, env = "FINBOT_STORAGE_DB")]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for FinBot
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Email that owns the saved chats (defaults to the logged-in user)
        #[arg(short, long)]
        user: Option<String>,

        /// Override the provider from config (auto, openai, gemini)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Inspect or remove saved chats
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Log in to the FinBot backend
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "FINBOT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a FinBot account
    Signup {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "FINBOT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation
        #[arg(long)]
        confirm_password: String,
    },

    /// Forget the stored session token
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Update or delete the logged-in account
    Account {
        /// Account subcommand
        #[command(subcommand)]
        command: AccountCommand,
    },
}

/// Saved-chat history subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List saved chats, most recently modified first
    List {
        /// Email that owns the saved chats (defaults to the logged-in user)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Delete the first saved chat with the given name
    Delete {
        /// Chat name
        #[arg(short, long)]
        name: String,

        /// Email that owns the saved chats (defaults to the logged-in user)
        #[arg(short, long)]
        user: Option<String>,
    },
}

/// Account management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommand {
    /// Change the account password
    Password {
        /// New password
        #[arg(long)]
        new_password: String,
    },

    /// Change the account email
    Email {
        /// New email
        #[arg(long)]
        new_email: String,
    },

    /// Update several profile fields at once
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New email
        #[arg(long)]
        email: Option<String>,

        /// New password
        #[arg(long)]
        password: Option<String>,
    },

    /// Permanently delete the account
    Delete {
        /// Confirm deletion without prompting
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            storage_path: None,
            command: Commands::Whoami,
        }
    }
}
