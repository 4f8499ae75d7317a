use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::model::PublicUser;
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Password rule shared by registration and reset: at least 6 chars
/// with a digit, a lowercase and an uppercase letter.
pub(crate) fn validate_password(password: &str) -> Vec<String> {
    let mut messages = Vec::new();
    if password.is_empty() {
        messages.push("Please enter a password".to_string());
        return messages;
    }
    if password.chars().count() < 6 {
        messages.push("Your password should have a minimum length of 6".to_string());
    }
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    if !(has_digit && has_lower && has_upper) {
        messages.push(
            "Your password MUST include a number, a lowercase letter and an uppercase letter"
                .to_string(),
        );
    }
    messages
}

fn validate_name(value: Option<&str>, label: &str, messages: &mut Vec<String>) -> String {
    let Some(value) = value else {
        messages.push(format!("{label} field is required"));
        return String::new();
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        messages.push(format!("Please enter your {}", label.to_lowercase()));
    } else if trimmed.chars().count() < 2 {
        messages.push(format!("Your {} should have a minimum length of 2", label.to_lowercase()));
    } else if trimmed.chars().count() > 50 {
        messages.push(format!("Your {} should have a maximum length of 50", label.to_lowercase()));
    }
    trimmed.to_string()
}

/// Registration payload. Fields are optional on the wire so that all
/// violations can be aggregated into a single 422 message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// A registration payload that survived validation.
#[derive(Debug)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Profile, ApiError> {
        let mut messages = Vec::new();

        let first_name = validate_name(self.first_name.as_deref(), "Firstname", &mut messages);
        let last_name = validate_name(self.last_name.as_deref(), "Lastname", &mut messages);

        let email = match self.email.as_deref().map(str::trim) {
            None => {
                messages.push("Email field is required".to_string());
                String::new()
            }
            Some("") => {
                messages.push("Please enter an email address".to_string());
                String::new()
            }
            Some(email) if !is_valid_email(email) => {
                messages.push("Please enter a valid email address".to_string());
                email.to_string()
            }
            Some(email) => email.to_string(),
        };

        let password = match self.password {
            None => {
                messages.push("Password field is required".to_string());
                String::new()
            }
            Some(password) => {
                messages.extend(validate_password(&password));
                password
            }
        };

        // Only self-registration as a plain user is allowed.
        if let Some(role) = self.role.as_deref() {
            if role != "user" {
                messages.push("Account role must be \"user\"".to_string());
            }
        }

        if !messages.is_empty() {
            return Err(ApiError::validation(messages));
        }
        Ok(Profile {
            first_name,
            last_name,
            email,
            password,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// Response returned whenever a session token is issued.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub status: bool,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub status: bool,
    pub data: PublicUser,
}
