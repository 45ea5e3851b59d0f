//! Chat session state for FinBot
//!
//! A [`ChatSession`] holds the active conversation, the user's saved-chat
//! catalog, and the debounced autosave task. It interprets slash commands,
//! forwards regular messages to the [`Responder`], and writes the catalog
//! through an injected [`CatalogStore`] after every catalog mutation.

pub mod autosave;

pub use autosave::Autosave;

use crate::commands::special_commands::{parse_special_command, SpecialCommand, HELP_TEXT};
use crate::config::ChatConfig;
use crate::providers::Responder;
use crate::storage::{
    new_id, user_storage_key, Catalog, CatalogStore, ChatMessage, Role, SavedChat,
    DEFAULT_CHAT_NAME,
};

use chrono::{Local, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Status appended after `/nc`
pub const NEW_CHAT_STATUS: &str = "Started a new chat. Your previous chat has been auto-saved.";

/// Status appended after `/clear`
pub const CLEARED_STATUS: &str = "Chat cleared.";

/// Status appended by `/list` when the catalog is empty
pub const NO_SAVED_CHATS_STATUS: &str = "No saved chats found.";

/// Status appended when the catalog could not be written
pub const NOT_PERSISTED_STATUS: &str =
    "Warning: your chats could not be written to local storage. This change may not survive a restart.";

/// Result of writing the active chat to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Catalog updated and persisted
    Saved,
    /// Nothing was written: the active chat has no conversation yet, or it
    /// was deleted and has not been saved again under a name
    Empty,
    /// Catalog updated in memory but the store rejected the write
    NotPersisted(String),
}

/// Result of `/delete`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed and persisted
    Deleted,
    /// No chat has that name
    NotFound,
    /// Removed in memory but the store rejected the write
    NotPersisted(String),
}

/// What happened to one line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input
    Ignored,
    /// A slash command ran and appended its status
    Command,
    /// Input started with `/` but matched no command
    UnknownCommand,
    /// The user turn and the assistant reply were appended
    Replied(String),
    /// A reply is still being generated; nothing was appended
    Busy,
}

/// Position in the active message sequence
///
/// Used to find what was appended since a point in time. The generation
/// changes whenever the sequence is replaced (`/nc`, `/clear`, `/load`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    generation: u64,
    len: usize,
}

#[derive(Debug)]
struct SessionState {
    messages: Vec<ChatMessage>,
    chat_id: Option<String>,
    chat_name: String,
    catalog: Catalog,
    generation: u64,
    /// Set when the active chat's catalog entry is deleted; only an explicit
    /// `/save` puts it back
    detached: bool,
}

impl SessionState {
    fn new(catalog: Catalog) -> Self {
        Self {
            messages: Vec::new(),
            chat_id: None,
            chat_name: DEFAULT_CHAT_NAME.to_string(),
            catalog,
            generation: 0,
            detached: false,
        }
    }

    fn has_conversation(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    fn reset(&mut self) {
        self.messages.clear();
        self.chat_id = None;
        self.chat_name = DEFAULT_CHAT_NAME.to_string();
        self.detached = false;
        self.generation += 1;
    }
}

struct SessionInner {
    user_key: String,
    store: Arc<dyn CatalogStore>,
    state: Mutex<SessionState>,
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, catalog: &Catalog) -> Result<(), String> {
        self.store.save(&self.user_key, catalog).map_err(|e| {
            tracing::warn!(user_key = %self.user_key, "Failed to persist chats: {:#}", e);
            e.to_string()
        })
    }

    /// Upsert the active chat into the catalog and persist it
    fn save_state(&self, state: &mut SessionState) -> SaveOutcome {
        if state.detached || !state.has_conversation() {
            return SaveOutcome::Empty;
        }

        let now = Utc::now();
        let id = state.chat_id.clone().unwrap_or_else(new_id);
        let created_at = state
            .catalog
            .get(&id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        state.catalog.upsert(SavedChat {
            id: id.clone(),
            name: state.chat_name.clone(),
            messages: state.messages.clone(),
            created_at,
            last_modified: now,
        });
        state.chat_id = Some(id);

        match self.persist(&state.catalog) {
            Ok(()) => {
                tracing::debug!(chat = %state.chat_name, messages = state.messages.len(), "Chat saved");
                SaveOutcome::Saved
            }
            Err(e) => SaveOutcome::NotPersisted(e),
        }
    }

    fn autosave(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!("Skipping autosave for a replaced chat");
            return;
        }
        if let SaveOutcome::NotPersisted(e) = self.save_state(&mut state) {
            tracing::error!("Autosave failed: {}", e);
        }
    }
}

/// One user's interactive chat session
pub struct ChatSession {
    inner: Arc<SessionInner>,
    responder: Arc<Responder>,
    autosave: Autosave,
}

impl ChatSession {
    /// Create a session for the catalog stored under `user_key`
    ///
    /// The catalog is loaded immediately; a missing or unreadable catalog
    /// starts empty.
    pub fn new(
        user_key: impl Into<String>,
        store: Arc<dyn CatalogStore>,
        responder: Arc<Responder>,
        autosave_delay: Duration,
    ) -> Self {
        let user_key = user_key.into();
        let catalog = store.load(&user_key);
        tracing::info!(user_key = %user_key, chats = catalog.len(), "Loaded saved chats");

        Self {
            inner: Arc::new(SessionInner {
                user_key,
                store,
                state: Mutex::new(SessionState::new(catalog)),
            }),
            responder,
            autosave: Autosave::new(autosave_delay),
        }
    }

    /// Create a session for `email` using the chat configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use finbot::config::ChatConfig;
    /// use finbot::providers::Responder;
    /// use finbot::session::ChatSession;
    /// use finbot::storage::MemoryStorage;
    ///
    /// let session = ChatSession::for_user(
    ///     "ada@example.com",
    ///     &ChatConfig::default(),
    ///     Arc::new(MemoryStorage::new()),
    ///     Arc::new(Responder::unconfigured()),
    /// );
    /// assert_eq!(session.user_key(), "finbot-chats-ada@example.com");
    /// assert_eq!(session.chat_name(), "New Chat");
    /// ```
    pub fn for_user(
        email: &str,
        config: &ChatConfig,
        store: Arc<dyn CatalogStore>,
        responder: Arc<Responder>,
    ) -> Self {
        Self::new(
            user_storage_key(&config.storage_key_prefix, email),
            store,
            responder,
            Duration::from_millis(config.autosave_delay_ms),
        )
    }

    /// Record key of this user's catalog
    pub fn user_key(&self) -> &str {
        &self.inner.user_key
    }

    /// Snapshot of the active messages
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.lock().messages.clone()
    }

    /// Id of the active chat, `None` until first saved
    pub fn chat_id(&self) -> Option<String> {
        self.inner.lock().chat_id.clone()
    }

    /// Name of the active chat
    pub fn chat_name(&self) -> String {
        self.inner.lock().chat_name.clone()
    }

    /// Snapshot of the in-memory catalog mirror
    pub fn catalog(&self) -> Catalog {
        self.inner.lock().catalog.clone()
    }

    /// Whether a reply is being generated
    pub fn is_busy(&self) -> bool {
        self.responder.is_busy()
    }

    /// Whether an autosave is scheduled and has not run yet
    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    /// Current position in the message sequence
    pub fn mark(&self) -> Mark {
        let state = self.inner.lock();
        Mark {
            generation: state.generation,
            len: state.messages.len(),
        }
    }

    /// Messages appended since `mark`
    ///
    /// If the sequence was replaced in the meantime, the whole new
    /// sequence is returned.
    pub fn messages_since(&self, mark: Mark) -> Vec<ChatMessage> {
        let state = self.inner.lock();
        if state.generation == mark.generation && mark.len <= state.messages.len() {
            state.messages[mark.len..].to_vec()
        } else {
            state.messages.clone()
        }
    }

    fn append(&self, message: ChatMessage) -> u64 {
        let mut state = self.inner.lock();
        state.messages.push(message);
        state.generation
    }

    fn schedule_autosave(&self, generation: u64) {
        let inner: Weak<SessionInner> = Arc::downgrade(&self.inner);
        self.autosave.schedule(move || {
            if let Some(inner) = inner.upgrade() {
                inner.autosave(generation);
            }
        });
    }

    /// Append a user turn and restart the autosave window
    pub fn push_user_message(&self, content: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::user(content);
        let generation = self.append(message.clone());
        self.schedule_autosave(generation);
        message
    }

    /// Append an assistant turn and restart the autosave window
    pub fn push_assistant_message(&self, content: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::assistant(content);
        let generation = self.append(message.clone());
        self.schedule_autosave(generation);
        message
    }

    /// Append a command status as an assistant message and restart the
    /// autosave window
    ///
    /// A chat holding only statuses is never written.
    pub fn push_status(&self, content: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::assistant(content);
        let generation = self.append(message.clone());
        self.schedule_autosave(generation);
        message
    }

    /// Save the active chat now, optionally renaming it first
    ///
    /// Creates a catalog entry on first save and overwrites it by id
    /// afterwards. Any pending autosave is cancelled. Naming a deleted
    /// active chat saves it again as a new entry.
    pub fn save_current(&self, name: Option<&str>) -> SaveOutcome {
        self.autosave.cancel();
        let mut state = self.inner.lock();
        if let Some(name) = name {
            state.chat_name = name.to_string();
            state.detached = false;
        }
        self.inner.save_state(&mut state)
    }

    /// Write pending turns of the active chat, if any
    pub fn flush(&self) -> SaveOutcome {
        self.save_current(None)
    }

    /// Save the outgoing chat and start an empty one
    pub fn start_new_chat(&self) -> SaveOutcome {
        self.autosave.cancel();
        let mut state = self.inner.lock();
        let outcome = self.inner.save_state(&mut state);
        state.reset();
        outcome
    }

    /// Discard the active chat without saving
    pub fn clear(&self) {
        self.autosave.cancel();
        self.inner.lock().reset();
    }

    /// Replace the active chat with the first saved chat named `name`
    ///
    /// Returns false, leaving the session untouched, if there is none.
    pub fn load_by_name(&self, name: &str) -> bool {
        let mut state = self.inner.lock();
        let Some(chat) = state.catalog.find_by_name(name).cloned() else {
            return false;
        };

        self.autosave.cancel();
        state.messages = chat.messages;
        state.chat_id = Some(chat.id);
        state.chat_name = chat.name;
        state.detached = false;
        state.generation += 1;
        true
    }

    /// Delete the first saved chat named `name`
    ///
    /// Deleting the active chat detaches it: its messages stay on screen,
    /// the pending autosave is dropped, and only an explicit `/save` writes
    /// it again.
    pub fn delete_by_name(&self, name: &str) -> DeleteOutcome {
        let mut state = self.inner.lock();
        let Some(removed) = state.catalog.remove_first_named(name) else {
            return DeleteOutcome::NotFound;
        };

        if state.chat_id.as_deref() == Some(removed.id.as_str()) {
            self.autosave.cancel();
            state.chat_id = None;
            state.detached = true;
        }

        match self.inner.persist(&state.catalog) {
            Ok(()) => DeleteOutcome::Deleted,
            Err(e) => DeleteOutcome::NotPersisted(e),
        }
    }

    /// Saved chats, most recently modified first
    pub fn list_chats(&self) -> Vec<SavedChat> {
        self.inner
            .lock()
            .catalog
            .by_last_modified()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Run a slash command and append its status
    ///
    /// Returns false, without touching any state, if `input` is not a
    /// recognized command.
    pub fn process_command(&self, input: &str) -> bool {
        match parse_special_command(input) {
            Ok(SpecialCommand::None) | Err(_) => false,
            Ok(command) => {
                self.execute(command);
                true
            }
        }
    }

    fn execute(&self, command: SpecialCommand) {
        match command {
            SpecialCommand::Help => {
                self.push_status(HELP_TEXT);
            }
            SpecialCommand::NewChat => {
                let outcome = self.start_new_chat();
                self.push_status(NEW_CHAT_STATUS);
                if let SaveOutcome::NotPersisted(_) = outcome {
                    self.push_status(NOT_PERSISTED_STATUS);
                }
            }
            SpecialCommand::Save(name) => match self.save_current(Some(name.as_str())) {
                SaveOutcome::Saved => {
                    self.push_status(format!("Chat saved as \"{}\".", name));
                }
                SaveOutcome::Empty => {
                    self.push_status(format!(
                        "Chat renamed to \"{}\". There are no messages to save yet.",
                        name
                    ));
                }
                SaveOutcome::NotPersisted(_) => {
                    self.push_status(format!("Chat saved as \"{}\".", name));
                    self.push_status(NOT_PERSISTED_STATUS);
                }
            },
            SpecialCommand::Load(name) => {
                if self.load_by_name(&name) {
                    self.push_status(format!("Loaded chat \"{}\".", name));
                } else {
                    self.push_status(format!(
                        "Chat \"{}\" not found. Use /list to see available chats.",
                        name
                    ));
                }
            }
            SpecialCommand::List => {
                let chats = self.list_chats();
                self.push_status(format_chat_list(&chats));
            }
            SpecialCommand::Delete(name) => match self.delete_by_name(&name) {
                DeleteOutcome::Deleted => {
                    self.push_status(format!("Chat \"{}\" deleted.", name));
                }
                DeleteOutcome::NotFound => {
                    self.push_status(format!("Chat \"{}\" not found.", name));
                }
                DeleteOutcome::NotPersisted(_) => {
                    self.push_status(format!("Chat \"{}\" deleted.", name));
                    self.push_status(NOT_PERSISTED_STATUS);
                }
            },
            SpecialCommand::Clear => {
                self.clear();
                self.push_status(CLEARED_STATUS);
            }
            SpecialCommand::None => {}
        }
    }

    /// Handle one line of user input
    ///
    /// Slash input runs as a command, or appends the unknown-command status.
    /// Anything else is a conversational turn: the user message and the
    /// reply are appended, unless a reply is already being generated.
    pub async fn submit(&self, input: &str) -> Submission {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Submission::Ignored;
        }

        if trimmed.starts_with('/') {
            if self.process_command(trimmed) {
                return Submission::Command;
            }
            self.push_status(format!(
                "Unknown command: {}. Type /help for available commands.",
                trimmed
            ));
            return Submission::UnknownCommand;
        }

        let Some(in_flight) = self.responder.try_begin() else {
            tracing::debug!("Rejected submission while a reply is pending");
            return Submission::Busy;
        };

        self.push_user_message(trimmed);
        let reply = in_flight.reply(trimmed).await;
        drop(in_flight);

        self.push_assistant_message(reply.clone());
        Submission::Replied(reply)
    }

    /// Cancel any pending autosave
    ///
    /// Call [`ChatSession::flush`] first to keep unsaved turns.
    pub fn shutdown(&self) {
        if self.autosave.cancel() {
            tracing::debug!("Cancelled pending autosave on shutdown");
        }
    }
}

/// Render the `/list` status text
///
/// # Examples
///
/// ```
/// use finbot::session::format_chat_list;
///
/// assert_eq!(format_chat_list(&[]), "No saved chats found.");
/// ```
pub fn format_chat_list(chats: &[SavedChat]) -> String {
    if chats.is_empty() {
        return NO_SAVED_CHATS_STATUS.to_string();
    }

    let lines: Vec<String> = chats
        .iter()
        .map(|chat| {
            format!(
                "• \"{}\" — {} messages — {}",
                chat.name,
                chat.messages.len(),
                chat.last_modified.with_timezone(&Local).format("%Y-%m-%d")
            )
        })
        .collect();

    format!("Saved Chats:\n{}", lines.join("\n"))
}
