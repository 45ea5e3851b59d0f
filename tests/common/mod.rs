use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use finbot::config::ProviderConfig;
use finbot::providers::Responder;
use finbot::session::ChatSession;
use finbot::storage::{CatalogStore, SqliteStorage};

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("finbot.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Provider settings pointing both backends at `api_base`
#[allow(dead_code)]
pub fn provider_config(api_base: &str, api_key: Option<&str>) -> ProviderConfig {
    let mut config = ProviderConfig {
        api_key: api_key.map(str::to_string),
        timeout_seconds: 5,
        ..ProviderConfig::default()
    };
    config.openai.api_base = api_base.to_string();
    config.gemini.api_base = api_base.to_string();
    config
}

/// A session with a long autosave delay so only explicit saves happen
#[allow(dead_code)]
pub fn session_with(store: Arc<dyn CatalogStore>, responder: Responder) -> ChatSession {
    ChatSession::new(
        "finbot-chats-ada@example.com",
        store,
        Arc::new(responder),
        Duration::from_secs(3600),
    )
}

/// An unsigned JWT whose payload expires `expires_in` seconds from now
#[allow(dead_code)]
pub fn make_jwt(expires_in: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + expires_in;
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}
