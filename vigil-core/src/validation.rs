//! Centralized validation utilities
//!
//! Password strength is checked against the live [`PasswordPolicy`] and
//! reported as a structured [`PasswordCheck`] rather than an error: weak
//! passwords are a normal outcome the caller turns into UX, not a failure
//! of the engine.

use regex::Regex;
use std::sync::LazyLock;

use crate::{config::PasswordPolicy, error::ValidationError};

/// Lazy-loaded email validation regex
///
/// Validates email addresses according to a practical subset of RFC 5322.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Outcome of a password-policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Validates an email address
///
/// Returns `Ok(())` if the email is valid, or a
/// `ValidationError::InvalidEmail` if invalid.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(format!(
            "Invalid email format: {email}"
        )))
    }
}

/// Check a password against the given policy.
///
/// Collects every violated rule so the caller can show all of them at once.
pub fn check_password(password: &str, policy: &PasswordPolicy) -> PasswordCheck {
    let mut errors = Vec::new();

    if password.len() < policy.min_length {
        errors.push(format!(
            "Password must be at least {} characters long",
            policy.min_length
        ));
    }

    if password.len() > 128 {
        errors.push("Password must be no more than 128 characters long".to_string());
    }

    if policy.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain an uppercase letter".to_string());
    }

    if policy.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain a lowercase letter".to_string());
    }

    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain a digit".to_string());
    }

    if policy.require_special && !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        errors.push("Password must contain a special character".to_string());
    }

    PasswordCheck {
        valid: errors.is_empty(),
        errors,
    }
}
