//! Client-side checks run before credentials are sent

use regex::Regex;
use std::sync::OnceLock;

/// Field-level validation messages; `None` means the field is valid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl ValidationErrors {
    /// Whether every field passed
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.confirm_password.is_none()
    }

    /// All messages, in field order
    pub fn messages(&self) -> Vec<&str> {
        [
            &self.name,
            &self.email,
            &self.password,
            &self.confirm_password,
        ]
        .into_iter()
        .filter_map(|m| m.as_deref())
        .collect()
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

/// Check an email address
///
/// # Examples
///
/// ```
/// use finbot::auth::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_none());
/// assert!(validate_email("not-an-email").is_some());
/// ```
pub fn validate_email(email: &str) -> Option<String> {
    if email.is_empty() {
        return Some("Email is required".to_string());
    }
    if !email_regex().is_match(email) {
        return Some("Please enter a valid email address".to_string());
    }
    None
}

/// Check password strength: 8+ characters with a lowercase letter, an
/// uppercase letter and a digit
pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Password is required".to_string());
    }
    if password.chars().count() < 8 {
        return Some("Password must be at least 8 characters long".to_string());
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Some(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .to_string(),
        );
    }
    None
}

/// Check a display name
pub fn validate_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("Name is required".to_string());
    }
    if name.chars().count() < 2 {
        return Some("Name must be at least 2 characters long".to_string());
    }
    None
}

/// Validate login input
pub fn validate_login_form(email: &str, password: &str) -> ValidationErrors {
    ValidationErrors {
        email: validate_email(email),
        password: validate_password(password),
        ..ValidationErrors::default()
    }
}

/// Validate signup input, including the password confirmation
pub fn validate_signup_form(
    name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> ValidationErrors {
    ValidationErrors {
        name: validate_name(name),
        email: validate_email(email),
        password: validate_password(password),
        confirm_password: (password != confirm_password)
            .then(|| "Passwords do not match".to_string()),
    }
}
