//! Slash command parser for interactive chat
//!
//! Commands manage the chat catalog instead of being sent to the model:
//! - Start, clear and save the current chat
//! - Load, list and delete saved chats
//! - Display help information
//!
//! Keywords are matched case-sensitively after trimming. Commands that take
//! a chat name require it in double quotes, e.g. `/save "Budget 2025"`.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Input starts with `/` but matches no command form
    #[error("Unknown command: {0}. Type /help for available commands.")]
    UnknownCommand(String),
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Show the command reference
    Help,

    /// Flush the current chat and start an empty one
    NewChat,

    /// Rename the current chat and save it
    Save(String),

    /// Replace the current chat with a saved one
    Load(String),

    /// List saved chats, most recently modified first
    List,

    /// Delete the first saved chat with this name
    Delete(String),

    /// Discard the current chat without saving
    Clear,

    /// Not a special command
    ///
    /// The input should be sent to the model as a regular message.
    None,
}

/// Command reference shown by `/help`
pub const HELP_TEXT: &str = "Available Commands:
• /help - Show this help message
• /nc - Start a new chat
• /save \"<name>\" - Save current chat with a name
• /load \"<name>\" - Load a previously saved chat
• /list - List all saved chats
• /delete \"<name>\" - Delete a saved chat
• /clear - Clear current chat";

fn quoted_command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^/(save|load|delete)\s+"([^"]+)"$"#).expect("quoted command pattern is valid")
    })
}

/// Parse a user input string into a special command
///
/// # Returns
///
/// Returns `Ok(SpecialCommand::None)` for input that does not start with `/`.
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` carrying the trimmed input if it
/// starts with `/` but is not a valid command. This includes `/save`,
/// `/load` and `/delete` without a quoted name.
///
/// # Examples
///
/// ```
/// use finbot::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/save \"Retirement\"").unwrap();
/// assert_eq!(cmd, SpecialCommand::Save("Retirement".to_string()));
///
/// let cmd = parse_special_command("What is an index fund?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/save Retirement").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    match trimmed {
        "/help" => return Ok(SpecialCommand::Help),
        "/nc" => return Ok(SpecialCommand::NewChat),
        "/list" => return Ok(SpecialCommand::List),
        "/clear" => return Ok(SpecialCommand::Clear),
        _ => {}
    }

    if let Some(caps) = quoted_command_regex().captures(trimmed) {
        let name = caps[2].to_string();
        return Ok(match &caps[1] {
            "save" => SpecialCommand::Save(name),
            "load" => SpecialCommand::Load(name),
            _ => SpecialCommand::Delete(name),
        });
    }

    Err(CommandError::UnknownCommand(trimmed.to_string()))
}

/// Whether the input ends the interactive session
///
/// `exit` and `quit` are handled by the terminal loop, not by the session.
pub fn is_exit_command(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}
