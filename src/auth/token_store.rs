//! Login token persistence in the local record store
//!
//! The bearer token and the logged-in user are kept under the `auth_token`
//! and `user_data` records, next to the chat catalogs. The token is a JWT;
//! its `exp` claim is checked locally whenever the current user is read.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::types::User;
use crate::error::Result;
use crate::storage::RecordStore;

/// Record holding the bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Record holding the logged-in user as JSON
pub const USER_DATA_KEY: &str = "user_data";

// ---------------------------------------------------------------------------
// JWT expiry
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD.decode(segment))
        .ok()
}

/// Whether `token` is a JWT whose `exp` claim is after `now` (Unix seconds)
///
/// Anything that is not a three-part token with a readable `exp` claim is
/// invalid.
pub fn token_is_valid(token: &str, now: i64) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return false;
    }

    decode_segment(parts[1])
        .and_then(|payload| serde_json::from_slice::<JwtClaims>(&payload).ok())
        .is_some_and(|claims| claims.exp > now)
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

/// Accessor for the stored login
#[derive(Clone)]
pub struct TokenStore {
    records: Arc<dyn RecordStore>,
}

impl TokenStore {
    /// Create a token store over `records`
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Remember a successful login
    ///
    /// # Errors
    ///
    /// Returns error if the record store rejects the write
    pub fn store_login(&self, token: &str, user: &User) -> Result<()> {
        self.records.set_item(AUTH_TOKEN_KEY, token)?;
        self.store_user(user)
    }

    /// Replace the stored user after a profile change
    ///
    /// # Errors
    ///
    /// Returns error if the record store rejects the write
    pub fn store_user(&self, user: &User) -> Result<()> {
        let json = serde_json::to_string(user)?;
        self.records.set_item(USER_DATA_KEY, &json)
    }

    /// Stored bearer token, without checking expiry
    pub fn token(&self) -> Option<String> {
        match self.records.get_item(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read auth token: {:#}", e);
                None
            }
        }
    }

    /// Forget the stored login
    pub fn clear(&self) {
        for key in [AUTH_TOKEN_KEY, USER_DATA_KEY] {
            if let Err(e) = self.records.remove_item(key) {
                tracing::warn!(key, "Failed to clear auth record: {:#}", e);
            }
        }
    }

    /// The logged-in user, if the stored token has not expired
    ///
    /// An expired token or unreadable user record clears the stored login.
    pub fn current_user(&self) -> Option<User> {
        let token = self.token()?;
        let user_data = self.records.get_item(USER_DATA_KEY).ok().flatten()?;

        if !token_is_valid(&token, chrono::Utc::now().timestamp()) {
            tracing::info!("Stored login has expired");
            self.clear();
            return None;
        }

        match serde_json::from_str::<User>(&user_data) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("Discarding unreadable user record: {}", e);
                self.clear();
                None
            }
        }
    }

    /// Whether a non-expired token is stored
    pub fn is_authenticated(&self) -> bool {
        self.token()
            .is_some_and(|t| token_is_valid(&t, chrono::Utc::now().timestamp()))
    }
}
