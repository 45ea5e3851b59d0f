//! HTTP client for the FinBot auth backend
//!
//! Every operation returns an [`AuthResponse`]: transport and backend
//! failures become `success: false` with a user-facing message instead of
//! an error. A 401 from any endpoint clears the stored login.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::auth::token_store::TokenStore;
use crate::auth::types::{
    AuthResponse, LoginCredentials, LoginResponse, ProfileUpdate, SignupCredentials,
    UpdateEmailRequest, UpdatePasswordRequest, User,
};
use crate::config::AuthConfig;
use crate::error::{FinbotError, Result};

/// Auth REST client
pub struct AuthClient {
    client: Client,
    api_base: String,
    tokens: TokenStore,
}

/// User-facing message for a failed status without a usable error body
fn default_status_message(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Invalid credentials or session expired".to_string(),
        403 => "Access forbidden".to_string(),
        404 => "User not found".to_string(),
        409 => "Email already exists. Please try logging in instead.".to_string(),
        422 => "Invalid data provided".to_string(),
        500 => "Server error. Please try again later.".to_string(),
        code => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP error! status: {}", code)),
    }
}

/// Message for a failed response
///
/// A JSON body supplies `message` or `error`, else the generic
/// `HTTP error! status: N`. Bodies that are not JSON objects fall back to
/// the status-specific text.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) if json.is_object() => ["message", "error"]
            .iter()
            .find_map(|field| {
                json.get(*field)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16())),
        _ => default_status_message(status),
    }
}

/// Message carried by an error, without the error-kind prefix for auth errors
fn failure_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<FinbotError>() {
        Some(FinbotError::Auth(message)) => message.clone(),
        _ => error.to_string(),
    }
}

impl AuthClient {
    /// Create a new auth client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &AuthConfig, tokens: TokenStore) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("finbot/0.1.0")
            .build()
            .map_err(|e| FinbotError::Auth(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Stored login accessor
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, endpoint))
    }

    fn authenticated(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let token = self
            .tokens
            .token()
            .ok_or_else(|| FinbotError::Auth("No authentication token found".to_string()))?;
        Ok(self.request(method, endpoint).bearer_auth(token))
    }

    /// Send a request and turn non-success statuses into auth errors
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(FinbotError::Http)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);

        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("Auth backend returned 401, clearing stored login");
            self.tokens.clear();
        }

        tracing::warn!(status = status.as_u16(), "Auth request failed: {}", message);
        Err(FinbotError::Auth(message).into())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let value = response.json::<T>().await.map_err(|e| {
            FinbotError::Auth(format!("Unexpected response from auth service: {}", e))
        })?;
        Ok(value)
    }

    /// Log in and remember the token and user
    pub async fn login(&self, credentials: &LoginCredentials) -> AuthResponse {
        let result: Result<LoginResponse> = self
            .send_json(self.request(Method::POST, "/users/login").json(credentials))
            .await;

        match result {
            Ok(login) => {
                if let Err(e) = self.tokens.store_login(&login.token, &login.user) {
                    tracing::error!("Failed to store login: {:#}", e);
                    return AuthResponse::failed(format!("Login succeeded but could not be saved: {}", e));
                }
                tracing::info!(user = %login.user.email, "Logged in");
                AuthResponse::ok("Login successful", Some(login.user), Some(login.token))
            }
            Err(e) => AuthResponse::failed(failure_message(&e)),
        }
    }

    /// Create an account; the user must log in afterwards
    pub async fn signup(&self, credentials: &SignupCredentials) -> AuthResponse {
        let result: Result<User> = self
            .send_json(self.request(Method::POST, "/users/signup").json(credentials))
            .await;

        match result {
            Ok(user) => AuthResponse::ok(
                "Account created successfully! Please log in with your credentials.",
                Some(user),
                None,
            ),
            Err(e) => AuthResponse::failed(failure_message(&e)),
        }
    }

    async fn update_user<B: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        success_message: &str,
    ) -> AuthResponse {
        let result: Result<User> = match self.authenticated(Method::PUT, endpoint) {
            Ok(request) => self.send_json(request.json(body)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(user) => {
                if let Err(e) = self.tokens.store_user(&user) {
                    tracing::warn!("Failed to update stored user: {:#}", e);
                }
                AuthResponse::ok(success_message, Some(user), None)
            }
            Err(e) => AuthResponse::failed(failure_message(&e)),
        }
    }

    /// Change the password of `user_id`
    pub async fn update_password(&self, user_id: &str, new_password: &str) -> AuthResponse {
        let body = UpdatePasswordRequest {
            new_password: new_password.to_string(),
        };
        self.update_user(
            &format!("/users/update/password/{}", user_id),
            &body,
            "Password updated successfully",
        )
        .await
    }

    /// Change the email address of `user_id`
    pub async fn update_email(&self, user_id: &str, new_email: &str) -> AuthResponse {
        let body = UpdateEmailRequest {
            new_email: new_email.to_string(),
        };
        self.update_user(
            &format!("/users/update/email/{}", user_id),
            &body,
            "Email updated successfully",
        )
        .await
    }

    /// Update several profile fields of `user_id` at once
    pub async fn update_profile(&self, user_id: &str, updates: &ProfileUpdate) -> AuthResponse {
        self.update_user(
            &format!("/users/updateAll/{}", user_id),
            updates,
            "Profile updated successfully",
        )
        .await
    }

    /// Delete the account `user_id` and forget the stored login
    pub async fn delete_user(&self, user_id: &str) -> AuthResponse {
        let endpoint = format!("/users/delete/{}", user_id);
        let result = match self.authenticated(Method::DELETE, &endpoint) {
            Ok(request) => self.send(request).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.tokens.clear();
                AuthResponse::ok("Account deleted successfully", None, None)
            }
            Err(e) => AuthResponse::failed(failure_message(&e)),
        }
    }

    /// Forget the stored login; the backend has no logout endpoint
    pub fn logout(&self) {
        self.tokens.clear();
    }

    /// The logged-in user, if the stored token is still valid
    pub fn current_user(&self) -> Option<User> {
        self.tokens.current_user()
    }
}
