//! Password reset flow.
//!
//! Requesting a reset never reveals whether an email is registered. Tokens
//! are single use, carry a 24 hour expiry and replace any earlier tokens of
//! the same user.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::auth::password::hash_password;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::mail::Mailer;
use crate::shared::validations::validate_password;

/// Token lifetime. The mail templates state the same figure.
pub const RESET_TOKEN_TTL_HOURS: i64 = 24;

/// Service for the forgot-password and reset-password operations
pub struct PasswordResetService {
    repos: Arc<dyn RepositoryProvider>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl PasswordResetService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, mailer: Arc<dyn Mailer>, base_url: &str) -> Self {
        Self {
            repos,
            mailer,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Issues a reset token and mails the link. Unknown emails succeed
    /// silently so the endpoint cannot be used to probe for accounts.
    pub async fn request_reset(&self, email: &str) -> DomainResult<()> {
        let user = match self.repos.users().find_by_email(email).await? {
            Some(user) => user,
            None => {
                debug!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        // A new request invalidates all earlier tokens
        self.repos.reset_tokens().delete_for_user(&user.id).await?;

        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.repos
            .reset_tokens()
            .insert(&user.id, &token, expires_at)
            .await?;

        let reset_url = format!("{}/reset-password?token={}", self.base_url, token);

        if let Err(e) = self
            .mailer
            .send_password_reset(&user.email, &user.username, &reset_url)
            .await
        {
            error!("Failed to send password reset email: {}", e);
            return Err(DomainError::Mail(
                "Failed to send password reset email. Please try again later.".to_string(),
            ));
        }

        info!("Password reset token issued for user {}", user.username);

        Ok(())
    }

    /// Token probe used by the reset form before it asks for a new password.
    pub async fn validate_token(&self, token: &str) -> DomainResult<bool> {
        let token = self.repos.reset_tokens().find_by_token(token).await?;
        Ok(token.map_or(false, |t| t.is_usable(Utc::now())))
    }

    /// Consumes the token and sets the new password.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> DomainResult<()> {
        validate_password(new_password)?;

        let reset = self
            .repos
            .reset_tokens()
            .find_by_token(token)
            .await?
            .ok_or_else(|| {
                DomainError::Validation("Invalid password reset token".to_string())
            })?;

        if reset.used {
            return Err(DomainError::TokenUsed);
        }
        if reset.is_expired(Utc::now()) {
            return Err(DomainError::TokenExpired);
        }

        let user = self
            .repos
            .users()
            .find_by_id(&reset.user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                field: "id",
                value: reset.user_id.clone(),
            })?;

        let password_hash = hash_password(new_password)
            .map_err(|e| DomainError::Validation(format!("Password hashing failed: {}", e)))?;

        self.repos
            .users()
            .update_password(&user.id, &password_hash)
            .await?;
        self.repos.reset_tokens().mark_used(&reset.id).await?;

        // Confirmation is best effort, the reset already happened
        if let Err(e) = self
            .mailer
            .send_password_changed(&user.email, &user.username)
            .await
        {
            warn!("Failed to send password change confirmation: {}", e);
        }

        info!("Password reset completed for user {}", user.username);

        Ok(())
    }

    /// Drops expired and spent tokens. Returns the number removed.
    pub async fn cleanup_expired(&self) -> DomainResult<u64> {
        let removed = self.repos.reset_tokens().delete_expired(Utc::now()).await?;

        if removed > 0 {
            info!("Removed {} stale password reset token(s)", removed);
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::in_memory_provider;
    use crate::auth::password::verify_password;
    use crate::domain::NewUser;
    use crate::mail::LogMailer;

    async fn seed_user(
        provider: &Arc<crate::application::services::test_support::InMemoryProvider>,
    ) -> String {
        provider
            .users()
            .insert(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: hash_password("oldsecret123").unwrap(),
                role: "USER".to_string(),
                enabled: true,
            })
            .await
            .unwrap()
            .id
    }

    fn service(
        provider: &Arc<crate::application::services::test_support::InMemoryProvider>,
    ) -> PasswordResetService {
        PasswordResetService::new(
            provider.clone(),
            Arc::new(LogMailer),
            "http://localhost:8080/",
        )
    }

    #[tokio::test]
    async fn test_unknown_email_succeeds_silently() {
        let provider = in_memory_provider();
        let service = service(&provider);

        service.request_reset("nobody@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_full_reset_flow() {
        let provider = in_memory_provider();
        let service = service(&provider);
        let user_id = seed_user(&provider).await;

        service.request_reset("alice@example.com").await.unwrap();

        let token = provider.latest_token_for(&user_id).unwrap();
        assert!(service.validate_token(&token.token).await.unwrap());

        service
            .reset_password(&token.token, "newsecret123")
            .await
            .unwrap();

        let user = provider.users().find_by_id(&user_id).await.unwrap().unwrap();
        assert!(verify_password("newsecret123", &user.password_hash).unwrap());

        // Single use
        let err = service
            .reset_password(&token.token, "another12345")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TokenUsed));
        assert!(!service.validate_token(&token.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_new_request_replaces_old_token() {
        let provider = in_memory_provider();
        let service = service(&provider);
        let user_id = seed_user(&provider).await;

        service.request_reset("alice@example.com").await.unwrap();
        let first = provider.latest_token_for(&user_id).unwrap();

        service.request_reset("alice@example.com").await.unwrap();
        let second = provider.latest_token_for(&user_id).unwrap();

        assert_ne!(first.token, second.token);
        assert!(!service.validate_token(&first.token).await.unwrap());
        assert!(service.validate_token(&second.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let provider = in_memory_provider();
        let service = service(&provider);
        let user_id = seed_user(&provider).await;

        provider
            .reset_tokens()
            .insert(&user_id, "stale-token", Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        assert!(!service.validate_token("stale-token").await.unwrap());

        let err = service
            .reset_password("stale-token", "newsecret123")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TokenExpired));
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_and_used() {
        let provider = in_memory_provider();
        let service = service(&provider);
        let user_id = seed_user(&provider).await;

        provider
            .reset_tokens()
            .insert(&user_id, "expired", Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        let live = provider
            .reset_tokens()
            .insert(&user_id, "live", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        provider
            .reset_tokens()
            .insert(&user_id, "spent", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        let spent = provider.latest_token_for(&user_id).unwrap();
        provider.reset_tokens().mark_used(&spent.id).await.unwrap();

        let removed = service.cleanup_expired().await.unwrap();
        assert_eq!(removed, 2);

        assert!(provider
            .reset_tokens()
            .find_by_token(&live.token)
            .await
            .unwrap()
            .is_some());
    }
}
