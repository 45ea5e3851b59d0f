//! Account commands backed by the auth service
//!
//! Form input is validated locally before anything is sent, mirroring the
//! checks the backend enforces.

use crate::auth::{
    validate_email, validate_login_form, validate_password, validate_signup_form, AuthClient,
    AuthResponse, LoginCredentials, ProfileUpdate, SignupCredentials, TokenStore, User,
    ValidationErrors,
};
use crate::cli::AccountCommand;
use crate::config::AuthConfig;
use crate::error::{FinbotError, Result};
use crate::storage::RecordStore;
use colored::Colorize;
use std::sync::Arc;

fn client(config: &AuthConfig, records: Arc<dyn RecordStore>) -> Result<AuthClient> {
    AuthClient::new(config, TokenStore::new(records))
}

fn ensure_valid(errors: ValidationErrors) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(FinbotError::Validation(errors.messages().join("; ")).into())
}

fn report(response: AuthResponse) -> Result<()> {
    let message = response.message.unwrap_or_default();
    if response.success {
        println!("{}", message.green());
        Ok(())
    } else {
        Err(FinbotError::Auth(message).into())
    }
}

fn require_user(client: &AuthClient) -> Result<User> {
    client.current_user().ok_or_else(|| {
        FinbotError::Auth("Not logged in. Run `finbot login` first.".to_string()).into()
    })
}

/// Log in and remember the session
pub async fn handle_login(
    config: &AuthConfig,
    records: Arc<dyn RecordStore>,
    email: String,
    password: String,
) -> Result<()> {
    ensure_valid(validate_login_form(&email, &password))?;
    let client = client(config, records)?;
    report(client.login(&LoginCredentials { email, password }).await)
}

/// Create an account
pub async fn handle_signup(
    config: &AuthConfig,
    records: Arc<dyn RecordStore>,
    credentials: SignupCredentials,
) -> Result<()> {
    ensure_valid(validate_signup_form(
        &credentials.name,
        &credentials.email,
        &credentials.password,
        &credentials.confirm_password,
    ))?;
    let client = client(config, records)?;
    report(client.signup(&credentials).await)
}

/// Forget the stored login
pub fn handle_logout(config: &AuthConfig, records: Arc<dyn RecordStore>) -> Result<()> {
    client(config, records)?.logout();
    println!("{}", "Logged out.".green());
    Ok(())
}

/// Show the logged-in user
pub fn handle_whoami(config: &AuthConfig, records: Arc<dyn RecordStore>) -> Result<()> {
    match client(config, records)?.current_user() {
        Some(user) => {
            println!("{} <{}>", user.name.bold(), user.email);
            println!("id: {}", user.id);
        }
        None => println!("{}", "Not logged in.".yellow()),
    }
    Ok(())
}

/// Handle `account` subcommands for the logged-in user
pub async fn handle_account(
    command: AccountCommand,
    config: &AuthConfig,
    records: Arc<dyn RecordStore>,
) -> Result<()> {
    let client = client(config, records)?;
    let user = require_user(&client)?;

    let response = match command {
        AccountCommand::Password { new_password } => {
            if let Some(message) = validate_password(&new_password) {
                return Err(FinbotError::Validation(message).into());
            }
            client.update_password(&user.id, &new_password).await
        }
        AccountCommand::Email { new_email } => {
            if let Some(message) = validate_email(&new_email) {
                return Err(FinbotError::Validation(message).into());
            }
            client.update_email(&user.id, &new_email).await
        }
        AccountCommand::Profile {
            name,
            email,
            password,
        } => {
            let updates = ProfileUpdate {
                name,
                email,
                password,
            };
            validate_profile_update(&updates)?;
            client.update_profile(&user.id, &updates).await
        }
        AccountCommand::Delete { yes } => {
            if !yes {
                return Err(FinbotError::Validation(
                    "Account deletion is permanent. Re-run with --yes to confirm.".to_string(),
                )
                .into());
            }
            client.delete_user(&user.id).await
        }
    };

    report(response)
}

fn validate_profile_update(updates: &ProfileUpdate) -> Result<()> {
    if updates.is_empty() {
        return Err(FinbotError::Validation(
            "Nothing to update. Pass --name, --email or --password.".to_string(),
        )
        .into());
    }

    let errors = ValidationErrors {
        name: updates.name.as_deref().and_then(crate::auth::validate_name),
        email: updates.email.as_deref().and_then(validate_email),
        password: updates.password.as_deref().and_then(validate_password),
        confirm_password: None,
    };
    ensure_valid(errors)
}
