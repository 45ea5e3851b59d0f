//! Account management for FinBot
//!
//! A thin client for the external auth backend (login, signup, profile
//! updates, account deletion), local validation of form input, and the
//! stored login that identifies whose chats a session opens.

pub mod client;
pub mod token_store;
pub mod types;
pub mod validation;

pub use client::AuthClient;
pub use token_store::{token_is_valid, TokenStore, AUTH_TOKEN_KEY, USER_DATA_KEY};
pub use types::{
    AuthResponse, LoginCredentials, LoginResponse, ProfileUpdate, SignupCredentials, User,
};
pub use validation::{
    validate_email, validate_login_form, validate_name, validate_password, validate_signup_form,
    ValidationErrors,
};
