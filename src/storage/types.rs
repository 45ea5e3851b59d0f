use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Name given to a chat until the user saves it under another one
pub const DEFAULT_CHAT_NAME: &str = "New Chat";

/// Build the record key holding a user's saved-chat catalog
///
/// # Examples
///
/// ```
/// use finbot::storage::user_storage_key;
///
/// assert_eq!(
///     user_storage_key("finbot-chats-", "ada@example.com"),
///     "finbot-chats-ada@example.com"
/// );
/// ```
pub fn user_storage_key(prefix: &str, email: &str) -> String {
    format!("{}{}", prefix, email)
}

/// Generate a new opaque, time-ordered identifier
pub fn new_id() -> String {
    Ulid::new().to_string()
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user
    User,
    /// Produced by the model or by a command status
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message
///
/// Messages are immutable once created and ordered by insertion in the
/// session's message sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Time-derived identifier
    pub id: String,
    /// Message text
    pub content: String,
    /// Who wrote it
    pub role: Role,
    /// When it was created
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message stamped with the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }

    /// Create a user message
    ///
    /// # Examples
    ///
    /// ```
    /// use finbot::storage::{ChatMessage, Role};
    ///
    /// let msg = ChatMessage::user("How should I budget?");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A named, persisted chat belonging to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedChat {
    /// Unique identifier, assigned at first save
    pub id: String,
    /// Display name; not required to be unique
    pub name: String,
    /// Messages at the time of the last save
    pub messages: Vec<ChatMessage>,
    /// Fixed at first save
    pub created_at: DateTime<Utc>,
    /// Updated on every save
    pub last_modified: DateTime<Utc>,
}

/// All saved chats of one user, in insertion order
///
/// Serialized as a plain JSON array so one record holds the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    chats: Vec<SavedChat>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved chats
    pub fn len(&self) -> usize {
        self.chats.len()
    }

    /// Whether the catalog holds no chats
    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Iterate over chats in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SavedChat> {
        self.chats.iter()
    }

    /// Look up a chat by id
    pub fn get(&self, id: &str) -> Option<&SavedChat> {
        self.chats.iter().find(|c| c.id == id)
    }

    /// First chat with the given name, in insertion order
    pub fn find_by_name(&self, name: &str) -> Option<&SavedChat> {
        self.chats.iter().find(|c| c.name == name)
    }

    /// Replace the chat with the same id, or append it
    pub fn upsert(&mut self, chat: SavedChat) {
        match self.chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => *existing = chat,
            None => self.chats.push(chat),
        }
    }

    /// Remove the first chat with the given name and return it
    pub fn remove_first_named(&mut self, name: &str) -> Option<SavedChat> {
        let pos = self.chats.iter().position(|c| c.name == name)?;
        Some(self.chats.remove(pos))
    }

    /// Chats ordered by `last_modified`, most recent first
    pub fn by_last_modified(&self) -> Vec<&SavedChat> {
        let mut chats: Vec<&SavedChat> = self.chats.iter().collect();
        chats.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        chats
    }
}

impl From<Vec<SavedChat>> for Catalog {
    fn from(chats: Vec<SavedChat>) -> Self {
        Self { chats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn chat(id: &str, name: &str, minutes_ago: i64) -> SavedChat {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        SavedChat {
            id: id.to_string(),
            name: name.to_string(),
            messages: vec![ChatMessage::user("hi")],
            created_at: at,
            last_modified: at,
        }
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_saved_chat_uses_camel_case_keys() {
        let json = serde_json::to_value(chat("1", "Budget", 0)).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("lastModified").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_catalog_serializes_as_array() {
        let catalog = Catalog::from(vec![chat("1", "A", 0)]);
        let json = serde_json::to_value(&catalog).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut catalog = Catalog::new();
        catalog.upsert(chat("1", "A", 0));
        catalog.upsert(chat("2", "B", 0));
        catalog.upsert(chat("1", "A renamed", 0));

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("1").unwrap().name, "A renamed");
        // Position is kept on replace
        assert_eq!(catalog.iter().next().unwrap().id, "1");
    }

    #[test]
    fn test_find_by_name_returns_first_match() {
        let catalog = Catalog::from(vec![chat("1", "Dup", 0), chat("2", "Dup", 0)]);
        assert_eq!(catalog.find_by_name("Dup").unwrap().id, "1");
        assert!(catalog.find_by_name("Missing").is_none());
    }

    #[test]
    fn test_remove_first_named_leaves_later_duplicates() {
        let mut catalog = Catalog::from(vec![chat("1", "Dup", 0), chat("2", "Dup", 0)]);
        let removed = catalog.remove_first_named("Dup").unwrap();
        assert_eq!(removed.id, "1");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find_by_name("Dup").unwrap().id, "2");
        assert!(catalog.remove_first_named("Missing").is_none());
    }

    #[test]
    fn test_by_last_modified_is_descending() {
        let catalog = Catalog::from(vec![
            chat("old", "Old", 30),
            chat("new", "New", 1),
            chat("mid", "Mid", 10),
        ]);
        let ids: Vec<&str> = catalog
            .by_last_modified()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = ChatMessage::user("a");
        let b = ChatMessage::assistant("b");
        assert_ne!(a.id, b.id);
    }
}
