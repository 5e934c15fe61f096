//! User account business logic

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::domain::{
    DomainError, DomainResult, NewUser, Permission, RepositoryProvider, Role, User, UserFilter,
    UserStats, UserUpdate,
};
use crate::shared::types::pagination::{PageRequest, PaginatedResult};
use crate::shared::validations::{validate_email, validate_password, validate_username};

/// Role mirrored into the user row when no real role is assigned
pub const FALLBACK_ROLE: &str = "USER";

/// Service for account management and credential checks
pub struct UserService {
    repos: Arc<dyn RepositoryProvider>,
}

impl UserService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Self-service registration. New accounts get the USER role.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> DomainResult<User> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        if self.repos.users().find_by_username(username).await?.is_some() {
            return Err(DomainError::Conflict("Username already exists".to_string()));
        }
        if self.repos.users().find_by_email(email).await?.is_some() {
            return Err(DomainError::Conflict("Email already exists".to_string()));
        }

        let password_hash = hash_password(password)
            .map_err(|e| DomainError::Validation(format!("Password hashing failed: {}", e)))?;

        let user = self
            .repos
            .users()
            .insert(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role: FALLBACK_ROLE.to_string(),
                enabled: true,
            })
            .await?;

        // Attach the USER role when the default set has been seeded
        if let Some(role) = self.repos.roles().find_by_name(FALLBACK_ROLE).await? {
            self.repos.users().assign_role(&user.id, &role.id).await?;
        }

        info!("User registered: {}", user.username);

        Ok(user)
    }

    /// Administrative account creation with an explicit role.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role_name: &str,
        enabled: bool,
    ) -> DomainResult<User> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        let role = self
            .repos
            .roles()
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Role",
                field: "name",
                value: role_name.to_string(),
            })?;

        let password_hash = hash_password(password)
            .map_err(|e| DomainError::Validation(format!("Password hashing failed: {}", e)))?;

        let user = self
            .repos
            .users()
            .insert(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role: role.name.clone(),
                enabled,
            })
            .await?;

        self.repos.users().assign_role(&user.id, &role.id).await?;
        self.refresh_primary_role(&user.id).await?;

        info!("User created: {} (role {})", user.username, role.name);

        self.get_user(&user.id).await
    }

    /// Credential check for the login flow. Accepts username or email.
    pub async fn authenticate(&self, login: &str, password: &str) -> DomainResult<User> {
        let user = self
            .repos
            .users()
            .find_by_login(login)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("Invalid credentials".to_string()))?;

        let valid = verify_password(password, &user.password_hash)
            .map_err(|e| DomainError::Validation(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(DomainError::Unauthorized("Invalid credentials".to_string()));
        }

        if !user.enabled {
            return Err(DomainError::Unauthorized("Account is disabled".to_string()));
        }

        // Login timestamp is best effort, a failure must not block the login
        if let Err(e) = self.repos.users().record_login(&user.id, Utc::now()).await {
            warn!("Failed to record login for {}: {}", user.username, e);
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> DomainResult<User> {
        self.repos
            .users()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })
    }

    pub async fn get_by_username(&self, username: &str) -> DomainResult<User> {
        self.repos
            .users()
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                field: "username",
                value: username.to_string(),
            })
    }

    pub async fn list_users(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<User>> {
        self.repos.users().list(filter, page).await
    }

    /// Updates profile fields and, when given, rewrites the role assignments.
    pub async fn update_user(
        &self,
        id: &str,
        email: Option<String>,
        enabled: Option<bool>,
        role_ids: Option<Vec<String>>,
    ) -> DomainResult<User> {
        if let Some(ref email) = email {
            validate_email(email)?;
        }

        self.repos
            .users()
            .update(id, UserUpdate { email, enabled })
            .await?;

        if let Some(role_ids) = role_ids {
            for role_id in &role_ids {
                if self.repos.roles().find_by_id(role_id).await?.is_none() {
                    return Err(DomainError::NotFound {
                        entity: "Role",
                        field: "id",
                        value: role_id.clone(),
                    });
                }
            }
            self.repos.users().replace_roles(id, &role_ids).await?;
            self.refresh_primary_role(id).await?;
        }

        self.get_user(id).await
    }

    /// Changes the password. `current` is verified when given; admin flows
    /// pass `None` to skip the check.
    pub async fn change_password(
        &self,
        id: &str,
        current: Option<&str>,
        new_password: &str,
    ) -> DomainResult<()> {
        validate_password(new_password)?;

        let user = self.get_user(id).await?;

        if let Some(current) = current {
            let valid = verify_password(current, &user.password_hash).map_err(|e| {
                DomainError::Validation(format!("Password verification failed: {}", e))
            })?;
            if !valid {
                return Err(DomainError::Unauthorized(
                    "Current password is incorrect".to_string(),
                ));
            }
        }

        let password_hash = hash_password(new_password)
            .map_err(|e| DomainError::Validation(format!("Password hashing failed: {}", e)))?;

        self.repos.users().update_password(id, &password_hash).await?;

        info!("Password changed for user {}", user.username);

        Ok(())
    }

    /// Deletes an account. Self-deletion is refused.
    pub async fn delete_user(&self, id: &str, acting_user_id: Option<&str>) -> DomainResult<()> {
        if acting_user_id == Some(id) {
            return Err(DomainError::Conflict(
                "You cannot delete your own account".to_string(),
            ));
        }

        self.repos.users().delete(id).await?;

        info!("User deleted: {}", id);

        Ok(())
    }

    pub async fn stats(&self) -> DomainResult<UserStats> {
        self.repos.users().stats().await
    }

    // ── Role assignments ─────────────────────────────────────────

    pub async fn roles_of(&self, user_id: &str) -> DomainResult<Vec<Role>> {
        self.repos.users().roles_of(user_id).await
    }

    pub async fn assign_role(&self, user_id: &str, role_name: &str) -> DomainResult<()> {
        let role = self.require_role(role_name).await?;
        self.repos.users().assign_role(user_id, &role.id).await?;
        self.refresh_primary_role(user_id).await?;

        info!("Role {} assigned to user {}", role.name, user_id);

        Ok(())
    }

    pub async fn remove_role(&self, user_id: &str, role_name: &str) -> DomainResult<()> {
        let role = self.require_role(role_name).await?;
        self.repos.users().remove_role(user_id, &role.id).await?;
        self.refresh_primary_role(user_id).await?;

        info!("Role {} removed from user {}", role.name, user_id);

        Ok(())
    }

    // ── Direct permission grants ─────────────────────────────────

    pub async fn direct_permissions(&self, user_id: &str) -> DomainResult<Vec<Permission>> {
        self.repos.users().direct_permissions_of(user_id).await
    }

    pub async fn effective_permissions(&self, user_id: &str) -> DomainResult<Vec<Permission>> {
        self.repos.permissions().effective_for_user(user_id).await
    }

    pub async fn grant_permission(
        &self,
        user_id: &str,
        permission_name: &str,
    ) -> DomainResult<()> {
        let permission = self.require_permission(permission_name).await?;
        self.repos
            .users()
            .grant_permission(user_id, &permission.id)
            .await?;

        info!("Permission {} granted to user {}", permission.name, user_id);

        Ok(())
    }

    pub async fn revoke_permission(
        &self,
        user_id: &str,
        permission_name: &str,
    ) -> DomainResult<()> {
        let permission = self.require_permission(permission_name).await?;
        self.repos
            .users()
            .revoke_permission(user_id, &permission.id)
            .await?;

        info!("Permission {} revoked from user {}", permission.name, user_id);

        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────

    async fn require_role(&self, name: &str) -> DomainResult<Role> {
        self.repos
            .roles()
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Role",
                field: "name",
                value: name.to_string(),
            })
    }

    async fn require_permission(&self, name: &str) -> DomainResult<Permission> {
        self.repos
            .permissions()
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Permission",
                field: "name",
                value: name.to_string(),
            })
    }

    /// Keeps the mirrored role column in sync with the assignments.
    /// ADMIN wins, otherwise the first assigned role by name, otherwise USER.
    async fn refresh_primary_role(&self, user_id: &str) -> DomainResult<()> {
        let roles = self.repos.users().roles_of(user_id).await?;

        let primary = if roles.iter().any(|r| r.name == "ADMIN") {
            "ADMIN".to_string()
        } else if let Some(first) = roles.first() {
            first.name.clone()
        } else {
            FALLBACK_ROLE.to_string()
        };

        self.repos.users().set_primary_role(user_id, &primary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::in_memory_provider;

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let service = UserService::new(in_memory_provider());

        let user = service
            .register("alice", "alice@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(user.role, "USER");
        assert!(user.enabled);

        let authed = service.authenticate("alice", "secret123").await.unwrap();
        assert_eq!(authed.id, user.id);

        // Email works as login too
        let authed = service
            .authenticate("alice@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let service = UserService::new(in_memory_provider());

        service
            .register("alice", "alice@example.com", "secret123")
            .await
            .unwrap();

        let err = service
            .register("alice", "other@example.com", "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let err = service
            .register("bob", "alice@example.com", "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_wrong_password_and_disabled() {
        let service = UserService::new(in_memory_provider());

        let user = service
            .register("alice", "alice@example.com", "secret123")
            .await
            .unwrap();

        let err = service.authenticate("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        service
            .update_user(&user.id, None, Some(false), None)
            .await
            .unwrap();

        let err = service
            .authenticate("alice", "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_change_password_verifies_current() {
        let service = UserService::new(in_memory_provider());

        let user = service
            .register("alice", "alice@example.com", "secret123")
            .await
            .unwrap();

        let err = service
            .change_password(&user.id, Some("wrong"), "newsecret123")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        service
            .change_password(&user.id, Some("secret123"), "newsecret123")
            .await
            .unwrap();

        service.authenticate("alice", "newsecret123").await.unwrap();
    }

    #[tokio::test]
    async fn test_self_delete_is_refused() {
        let service = UserService::new(in_memory_provider());

        let user = service
            .register("alice", "alice@example.com", "secret123")
            .await
            .unwrap();

        let err = service
            .delete_user(&user.id, Some(&user.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        service.delete_user(&user.id, None).await.unwrap();
        assert!(matches!(
            service.get_user(&user.id).await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_role_assignment_updates_mirror() {
        let provider = in_memory_provider();
        let service = UserService::new(provider.clone());

        provider.roles().insert("ADMIN", None).await.unwrap();
        provider.roles().insert("MODERATOR", None).await.unwrap();

        let user = service
            .register("alice", "alice@example.com", "secret123")
            .await
            .unwrap();

        service.assign_role(&user.id, "MODERATOR").await.unwrap();
        assert_eq!(service.get_user(&user.id).await.unwrap().role, "MODERATOR");

        // ADMIN takes precedence over other assignments
        service.assign_role(&user.id, "ADMIN").await.unwrap();
        assert_eq!(service.get_user(&user.id).await.unwrap().role, "ADMIN");

        service.remove_role(&user.id, "ADMIN").await.unwrap();
        assert_eq!(service.get_user(&user.id).await.unwrap().role, "MODERATOR");

        service.remove_role(&user.id, "MODERATOR").await.unwrap();
        assert_eq!(service.get_user(&user.id).await.unwrap().role, "USER");
    }
}
