//! Service-level input validation.
//!
//! HTTP DTOs already run `validator` derive checks; these helpers are the
//! backstop for callers that bypass HTTP (bootstrap, demo code, tests) so
//! every path enforces the same rules.

use crate::shared::types::errors::{DomainError, DomainResult};

pub fn validate_pagination(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    (page, limit)
}

/// Usernames: 3..=50 characters after trimming.
pub fn validate_username(username: &str) -> DomainResult<()> {
    let len = username.trim().chars().count();
    if !(3..=50).contains(&len) {
        return Err(DomainError::Validation(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> DomainResult<()> {
    let ok = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !ok {
        return Err(DomainError::Validation("Invalid email format".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> DomainResult<()> {
    if !(8..=128).contains(&password.chars().count()) {
        return Err(DomainError::Validation(
            "Password must be between 8 and 128 characters".to_string(),
        ));
    }
    Ok(())
}

/// Role and permission names: UPPER_SNAKE, 2..=64 characters.
pub fn validate_grant_name(name: &str) -> DomainResult<()> {
    let len_ok = (2..=64).contains(&name.chars().count());
    let charset_ok = name.chars().all(|c| c.is_ascii_uppercase() || c == '_');
    if !len_ok || !charset_ok {
        return Err(DomainError::Validation(
            "Name must be 2-64 characters of A-Z and underscores".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(validate_pagination(None, None), (1, 20));
        assert_eq!(validate_pagination(Some(0), Some(500)), (1, 100));
        assert_eq!(validate_pagination(Some(3), Some(50)), (3, 50));
    }

    #[test]
    fn test_username_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("bob").is_ok());
        assert!(validate_username(&"x".repeat(51)).is_err());
        // surrounding whitespace does not count toward the length
        assert!(validate_username("  ab  ").is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("userexample.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn test_password_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn test_grant_names() {
        assert!(validate_grant_name("USER_VIEW").is_ok());
        assert!(validate_grant_name("ADMIN").is_ok());
        assert!(validate_grant_name("user_view").is_err());
        assert!(validate_grant_name("USER-VIEW").is_err());
        assert!(validate_grant_name("A").is_err());
    }
}
