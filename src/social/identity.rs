/// Input normalization for identity fields.
/// Emails and usernames are compared case-insensitively, so they are
/// trimmed and lowercased before they reach storage.
use crate::error::{AppError, Result};

/// Trim and lowercase an email, rejecting anything that cannot be an address.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AppError::validation(format!("Invalid email: {:?}", raw)));
    }
    Ok(email)
}

pub fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(AppError::validation(format!("Invalid username: {:?}", raw)));
    }
    Ok(username)
}

/// Require a non-blank text field, returning it trimmed.
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  A@X.com ").unwrap(), "a@x.com");
    }

    #[test]
    fn test_malformed_emails_rejected() {
        for raw in ["", "   ", "no-at-sign", "@x.com", "a@", "a@b@c", "a b@x.com"] {
            assert!(normalize_email(raw).is_err(), "{:?} should be rejected", raw);
        }
    }

    #[test]
    fn test_username_normalization() {
        assert_eq!(normalize_username(" Alice ").unwrap(), "alice");
        assert!(normalize_username("").is_err());
        assert!(normalize_username("two words").is_err());
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("content", " hello ").unwrap(), "hello");
        let err = require_text("content", "  ").unwrap_err();
        assert_eq!(err.to_string(), "content must not be empty");
    }
}
