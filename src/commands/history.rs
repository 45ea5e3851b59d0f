use crate::auth::TokenStore;
use crate::cli::HistoryCommand;
use crate::commands::{open_record_store, resolve_user_email};
use crate::config::ChatConfig;
use crate::error::{FinbotError, Result};
use crate::storage::{user_storage_key, Catalog, CatalogStore, RecordStore};
use chrono::Local;
use colored::Colorize;
use prettytable::{format, Table};
use std::sync::Arc;

/// Handle history commands
pub fn handle_history(
    command: HistoryCommand,
    config: &ChatConfig,
    storage_path: Option<&str>,
) -> Result<()> {
    let records = open_record_store(storage_path)?;

    match command {
        HistoryCommand::List { user } => {
            let key = catalog_key(&records, user.as_deref(), config)?;
            let catalog = records.load(&key);
            print_catalog(&catalog);
        }
        HistoryCommand::Delete { name, user } => {
            let key = catalog_key(&records, user.as_deref(), config)?;
            delete_chat(records.as_ref(), &key, &name)?;
            println!("{}", format!("Chat \"{}\" deleted.", name).green());
        }
    }

    Ok(())
}

fn catalog_key(
    records: &Arc<dyn RecordStore>,
    user: Option<&str>,
    config: &ChatConfig,
) -> Result<String> {
    let tokens = TokenStore::new(records.clone());
    let email = resolve_user_email(user, &tokens)?;
    Ok(user_storage_key(&config.storage_key_prefix, &email))
}

/// Remove the first chat called `name` from the catalog under `key`
///
/// # Errors
///
/// Returns error if no chat has that name or the catalog cannot be written
pub fn delete_chat<S: CatalogStore + ?Sized>(store: &S, key: &str, name: &str) -> Result<()> {
    let mut catalog = store.load(key);
    if catalog.remove_first_named(name).is_none() {
        return Err(FinbotError::Storage(format!("Chat \"{}\" not found.", name)).into());
    }
    store.save(key, &catalog)
}

fn print_catalog(catalog: &Catalog) {
    if catalog.is_empty() {
        println!("{}", "No saved chats found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "Name".bold(),
        "Messages".bold(),
        "Created".bold(),
        "Last Modified".bold()
    ]);

    for chat in catalog.by_last_modified() {
        let name = if chat.name.chars().count() > 40 {
            format!("{}...", chat.name.chars().take(37).collect::<String>())
        } else {
            chat.name.clone()
        };
        let created = chat
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        let updated = chat
            .last_modified
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(prettytable::row![
            name.cyan(),
            chat.messages.len(),
            created,
            updated
        ]);
    }

    println!("\nSaved Chats:");
    table.printstd();
    println!();
    println!(
        "Use {} inside a chat to continue one.",
        "/load \"<name>\"".cyan()
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ChatMessage, MemoryStorage, SavedChat};
    use chrono::Utc;

    fn chat(id: &str, name: &str) -> SavedChat {
        SavedChat {
            id: id.into(),
            name: name.into(),
            messages: vec![ChatMessage::user("hi")],
            created_at: Utc::now(),
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn test_delete_chat_removes_first_match() {
        let store = MemoryStorage::new();
        let catalog = Catalog::from(vec![chat("1", "Dup"), chat("2", "Dup")]);
        store.save("k", &catalog).unwrap();

        delete_chat(&store, "k", "Dup").unwrap();

        let remaining = store.load("k");
        assert_eq!(remaining.len(), 1);
        assert!(remaining.get("2").is_some());
    }

    #[test]
    fn test_delete_chat_missing_name_is_error() {
        let store = MemoryStorage::new();
        store
            .save("k", &Catalog::from(vec![chat("1", "Keep")]))
            .unwrap();

        assert!(delete_chat(&store, "k", "Other").is_err());
        assert_eq!(store.load("k").len(), 1);
    }

    #[test]
    fn test_print_catalog_handles_empty_and_long_names() {
        print_catalog(&Catalog::new());
        print_catalog(&Catalog::from(vec![chat("1", &"x".repeat(60))]));
    }
}
