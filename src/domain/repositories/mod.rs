//! Repository traits for the domain layer
//!
//! One trait per aggregate plus `RepositoryProvider`, the unified access
//! point services receive. Implementations live in
//! `infrastructure::database::repositories`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{
    NewUser, Permission, ResetToken, Role, User, UserFilter, UserStats, UserUpdate,
};
use crate::shared::types::pagination::{PageRequest, PaginatedResult};
use crate::shared::types::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: NewUser) -> DomainResult<User>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    /// Login lookup: matches either the username or the email column
    async fn find_by_login(&self, login: &str) -> DomainResult<Option<User>>;
    async fn list(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<User>>;
    async fn update(&self, id: &str, update: UserUpdate) -> DomainResult<User>;
    async fn update_password(&self, id: &str, password_hash: &str) -> DomainResult<()>;
    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()>;
    /// Rewrites the mirrored primary-role column
    async fn set_primary_role(&self, id: &str, role: &str) -> DomainResult<()>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
    async fn stats(&self) -> DomainResult<UserStats>;

    // Role assignments
    async fn roles_of(&self, user_id: &str) -> DomainResult<Vec<Role>>;
    async fn assign_role(&self, user_id: &str, role_id: &str) -> DomainResult<()>;
    async fn remove_role(&self, user_id: &str, role_id: &str) -> DomainResult<()>;
    async fn replace_roles(&self, user_id: &str, role_ids: &[String]) -> DomainResult<()>;

    // Direct permission grants
    async fn direct_permissions_of(&self, user_id: &str) -> DomainResult<Vec<Permission>>;
    async fn grant_permission(&self, user_id: &str, permission_id: &str) -> DomainResult<()>;
    async fn revoke_permission(&self, user_id: &str, permission_id: &str) -> DomainResult<()>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn insert(&self, name: &str, description: Option<&str>) -> DomainResult<Role>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Role>>;
    async fn list(&self) -> DomainResult<Vec<Role>>;
    async fn update(&self, id: &str, description: Option<&str>) -> DomainResult<Role>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
    /// Users currently holding this role; deletion is refused while > 0
    async fn assigned_user_count(&self, id: &str) -> DomainResult<u64>;
    async fn set_permissions(&self, id: &str, permission_ids: &[String]) -> DomainResult<()>;
    async fn add_permission(&self, id: &str, permission_id: &str) -> DomainResult<()>;
    async fn remove_permission(&self, id: &str, permission_id: &str) -> DomainResult<()>;
}

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn insert(
        &self,
        name: &str,
        description: Option<&str>,
        category: &str,
    ) -> DomainResult<Permission>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Permission>>;
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Permission>>;
    async fn list(&self, category: Option<&str>) -> DomainResult<Vec<Permission>>;
    async fn categories(&self) -> DomainResult<Vec<String>>;
    async fn update(
        &self,
        id: &str,
        description: Option<&str>,
        category: Option<&str>,
    ) -> DomainResult<Permission>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
    /// References from roles plus direct user grants; deletion is refused while > 0
    async fn usage_count(&self, id: &str) -> DomainResult<u64>;
    /// Direct grants united with permissions of every assigned role
    async fn effective_for_user(&self, user_id: &str) -> DomainResult<Vec<Permission>>;
}

#[async_trait]
pub trait ResetTokenRepository: Send + Sync {
    async fn insert(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<ResetToken>;
    async fn find_by_token(&self, token: &str) -> DomainResult<Option<ResetToken>>;
    async fn mark_used(&self, id: &str) -> DomainResult<()>;
    /// Invalidates earlier requests when a new token is issued
    async fn delete_for_user(&self, user_id: &str) -> DomainResult<u64>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> DomainResult<u64>;
}

/// Provides access to all domain repositories.
///
/// Services request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let user = repos.users().find_by_login("alice").await?;
///     let grants = repos.permissions().effective_for_user(&user.id).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn roles(&self) -> &dyn RoleRepository;
    fn permissions(&self) -> &dyn PermissionRepository;
    fn reset_tokens(&self) -> &dyn ResetTokenRepository;
}
