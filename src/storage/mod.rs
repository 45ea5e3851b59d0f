//! Local persistence for FinBot
//!
//! A string-keyed record store (the terminal counterpart of browser local
//! storage) and the saved-chat catalog adapter built on top of it. Each user's
//! catalog lives in a single record whose value is the JSON array of chats.

use crate::error::{FinbotError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub mod types;
pub use types::{
    new_id, user_storage_key, Catalog, ChatMessage, Role, SavedChat, DEFAULT_CHAT_NAME,
};

/// String-keyed record storage
pub trait RecordStore: Send + Sync {
    /// Read a record, `None` when the key is absent
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite a record
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a record; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// Persistence adapter for saved-chat catalogs
///
/// `load` never fails: a missing or unreadable record yields an empty
/// catalog so the chat stays usable. `save` reports failure and leaves the
/// caller's in-memory state untouched.
pub trait CatalogStore: Send + Sync {
    /// Load the catalog stored under `user_key`
    fn load(&self, user_key: &str) -> Catalog;

    /// Persist `catalog` under `user_key`
    fn save(&self, user_key: &str, catalog: &Catalog) -> Result<()>;
}

impl<T: RecordStore + ?Sized> CatalogStore for T {
    fn load(&self, user_key: &str) -> Catalog {
        let raw = match self.get_item(user_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Catalog::new(),
            Err(e) => {
                tracing::warn!(key = %user_key, "Failed to read saved chats: {}", e);
                return Catalog::new();
            }
        };

        match serde_json::from_str::<Catalog>(&raw) {
            Ok(catalog) => {
                tracing::debug!(key = %user_key, chats = catalog.len(), "Loaded saved chats");
                catalog
            }
            Err(e) => {
                tracing::warn!(key = %user_key, "Ignoring malformed saved chats: {}", e);
                Catalog::new()
            }
        }
    }

    fn save(&self, user_key: &str, catalog: &Catalog) -> Result<()> {
        let json = serde_json::to_string(catalog).map_err(FinbotError::Serialization)?;
        self.set_item(user_key, &json)?;
        tracing::debug!(key = %user_key, chats = catalog.len(), "Saved chats");
        Ok(())
    }
}

/// SQLite-backed record store
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory, unless
    /// `FINBOT_STORAGE_DB` points somewhere else.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("FINBOT_STORAGE_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "finbot", "finbot")
            .ok_or_else(|| FinbotError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("storage.db"))
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use finbot::storage::{RecordStore, SqliteStorage};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("storage.db")).unwrap();
    /// storage.set_item("greeting", "hello").unwrap();
    /// assert_eq!(storage.get_item("greeting").unwrap().as_deref(), Some("hello"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| FinbotError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the backing database file
    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| FinbotError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| FinbotError::Storage(e.to_string()))?;

        Ok(())
    }
}

impl RecordStore for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.open()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query record")
            .map_err(|e| FinbotError::Storage(e.to_string()))?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .context("Failed to write record")
        .map_err(|e| FinbotError::Storage(e.to_string()))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM local_storage WHERE key = ?", params![key])
            .context("Failed to delete record")
            .map_err(|e| FinbotError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// In-process record store
///
/// Used when the on-disk store cannot be opened; contents are lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let records = self
            .records
            .lock()
            .map_err(|_| FinbotError::Storage("memory storage lock poisoned".into()))?;
        Ok(records.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| FinbotError::Storage("memory storage lock poisoned".into()))?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| FinbotError::Storage("memory storage lock poisoned".into()))?;
        records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rusqlite::Connection;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    fn create_test_storage() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("storage.db");
        let storage = SqliteStorage::new_with_path(db_path).expect("failed to create storage");
        (storage, dir)
    }

    fn sample_catalog() -> Catalog {
        let created: DateTime<Utc> = "2026-03-01T09:15:30.123456789Z".parse().unwrap();
        let modified: DateTime<Utc> = "2026-03-02T18:00:05Z".parse().unwrap();
        let mut msg = ChatMessage::user("How do I start investing?");
        msg.timestamp = created;
        Catalog::from(vec![SavedChat {
            id: "01HZX".to_string(),
            name: "Investing".to_string(),
            messages: vec![msg, ChatMessage::assistant("Start with an index fund.")],
            created_at: created,
            last_modified: modified,
        }])
    }

    #[test]
    fn test_sqlite_storage_init_creates_table() {
        let (storage, _dir) = create_test_storage();
        let conn = Connection::open(&storage.db_path).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='local_storage'",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_get_item_returns_none_for_missing_key() {
        let (storage, _dir) = create_test_storage();
        assert!(storage.get_item("missing").unwrap().is_none());
    }

    #[test]
    fn test_set_item_overwrites_existing_value() {
        let (storage, _dir) = create_test_storage();
        storage.set_item("k", "one").unwrap();
        storage.set_item("k", "two").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_remove_item_is_idempotent() {
        let (storage, _dir) = create_test_storage();
        storage.set_item("k", "v").unwrap();
        storage.remove_item("k").unwrap();
        storage.remove_item("k").unwrap();
        assert!(storage.get_item("k").unwrap().is_none());
    }

    #[test]
    fn test_catalog_load_missing_key_is_empty() {
        let (storage, _dir) = create_test_storage();
        assert!(storage.load("finbot-chats-nobody@example.com").is_empty());
    }

    #[test]
    fn test_catalog_load_malformed_json_is_empty() {
        let storage = MemoryStorage::new();
        storage
            .set_item("finbot-chats-a@b.co", "{not json")
            .unwrap();
        assert!(storage.load("finbot-chats-a@b.co").is_empty());

        storage
            .set_item("finbot-chats-a@b.co", r#"{"id":"object, not array"}"#)
            .unwrap();
        assert!(storage.load("finbot-chats-a@b.co").is_empty());
    }

    #[test]
    fn test_catalog_round_trip_preserves_dates() {
        let (storage, _dir) = create_test_storage();
        let catalog = sample_catalog();
        storage.save("finbot-chats-a@b.co", &catalog).unwrap();

        let loaded = storage.load("finbot-chats-a@b.co");
        let original = catalog.iter().next().unwrap();
        let restored = loaded.iter().next().unwrap();

        assert_eq!(
            restored.created_at.timestamp(),
            original.created_at.timestamp()
        );
        assert_eq!(
            restored.last_modified.timestamp(),
            original.last_modified.timestamp()
        );
        assert_eq!(
            restored.messages[0].timestamp.timestamp(),
            original.messages[0].timestamp.timestamp()
        );
        assert_eq!(restored.messages, original.messages);
    }

    #[test]
    fn test_catalog_is_stored_as_text_dates() {
        let storage = MemoryStorage::new();
        storage.save("k", &sample_catalog()).unwrap();
        let raw = storage.get_item("k").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["lastModified"], "2026-03-02T18:00:05Z");
        assert_eq!(json[0]["messages"][0]["role"], "user");
    }

    #[test]
    fn test_catalogs_are_isolated_per_user() {
        let storage = MemoryStorage::new();
        storage
            .save(&user_storage_key("finbot-chats-", "a@b.co"), &sample_catalog())
            .unwrap();
        assert!(storage
            .load(&user_storage_key("finbot-chats-", "c@d.co"))
            .is_empty());
        assert_eq!(
            storage
                .load(&user_storage_key("finbot-chats-", "a@b.co"))
                .len(),
            1
        );
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("storage.db");
        env::set_var("FINBOT_STORAGE_DB", db_path.to_string_lossy().to_string());

        let storage = SqliteStorage::new().expect("new failed with env override");
        assert_eq!(storage.db_path, db_path);
        assert!(db_path.parent().unwrap().exists());

        env::remove_var("FINBOT_STORAGE_DB");
    }
}
