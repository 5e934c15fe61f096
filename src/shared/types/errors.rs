use thiserror::Error;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Reset token has expired")]
    TokenExpired,

    #[error("Reset token has already been used")]
    TokenUsed,
}

impl DomainError {
    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            // DB errors mapped from repositories carry a "Database error:" prefix
            DomainError::Validation(msg) => msg.starts_with("Database error:"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DomainError::NotFound {
            entity: "User",
            field: "id",
            value: "42".to_string(),
        };
        assert_eq!(err.to_string(), "Not found: User with id=42");
    }

    #[test]
    fn test_transient_detection() {
        let db = DomainError::Validation("Database error: connection reset".to_string());
        assert!(db.is_transient());

        let plain = DomainError::Validation("username too short".to_string());
        assert!(!plain.is_transient());

        assert!(!DomainError::TokenExpired.is_transient());
    }
}
