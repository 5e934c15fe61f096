//! Access checks built on roles and effective permissions.
//!
//! Effective permissions are the union of permissions inherited through
//! assigned roles and permissions granted to the user directly. The
//! mirrored role column counts as a role on its own, so accounts that
//! predate role assignments keep working.

use std::sync::Arc;

use crate::domain::{DomainResult, RepositoryProvider};

/// Permissions that open the monitoring endpoints
pub const MONITORING_PERMISSIONS: [&str; 6] = [
    "MONITOR_HEALTH",
    "MONITOR_METRICS",
    "MONITOR_INFO",
    "MONITOR_LOGS",
    "MONITOR_LOG_STREAM",
    "MONITOR_STATS",
];

/// Permissions that open the user management endpoints
pub const USER_MANAGEMENT_PERMISSIONS: [&str; 4] =
    ["USER_CREATE", "USER_UPDATE", "USER_DELETE", "USER_VIEW"];

/// Service for authorization decisions
pub struct AuthorizationService {
    repos: Arc<dyn RepositoryProvider>,
}

impl AuthorizationService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Names of every permission the user holds, directly or through roles.
    pub async fn effective_permission_names(&self, user_id: &str) -> DomainResult<Vec<String>> {
        let permissions = self.repos.permissions().effective_for_user(user_id).await?;
        Ok(permissions.into_iter().map(|p| p.name).collect())
    }

    pub async fn has_permission(&self, user_id: &str, permission: &str) -> DomainResult<bool> {
        let names = self.effective_permission_names(user_id).await?;
        Ok(names.iter().any(|n| n == permission))
    }

    pub async fn has_any_permission(
        &self,
        user_id: &str,
        permissions: &[&str],
    ) -> DomainResult<bool> {
        let names = self.effective_permission_names(user_id).await?;
        Ok(permissions.iter().any(|p| names.iter().any(|n| n == p)))
    }

    pub async fn has_all_permissions(
        &self,
        user_id: &str,
        permissions: &[&str],
    ) -> DomainResult<bool> {
        let names = self.effective_permission_names(user_id).await?;
        Ok(permissions.iter().all(|p| names.iter().any(|n| n == p)))
    }

    /// Checks assigned roles and the mirrored role column.
    pub async fn has_role(&self, user_id: &str, role_name: &str) -> DomainResult<bool> {
        if let Some(user) = self.repos.users().find_by_id(user_id).await? {
            if user.role == role_name {
                return Ok(true);
            }
        }

        let roles = self.repos.users().roles_of(user_id).await?;
        Ok(roles.iter().any(|r| r.name == role_name))
    }

    /// Owner of the resource, or an admin.
    pub async fn is_owner_or_admin(&self, user_id: &str, owner_id: &str) -> DomainResult<bool> {
        if user_id == owner_id {
            return Ok(true);
        }
        self.has_role(user_id, "ADMIN").await
    }

    /// Gate for the admin dashboard: the ADMIN role, the SYSTEM_ADMIN
    /// permission or the DASHBOARD_VIEW permission all open it.
    pub async fn can_access_admin(&self, user_id: &str) -> DomainResult<bool> {
        if self.has_role(user_id, "ADMIN").await? {
            return Ok(true);
        }
        self.has_any_permission(user_id, &["SYSTEM_ADMIN", "DASHBOARD_VIEW"])
            .await
    }

    pub async fn can_manage_users(&self, user_id: &str) -> DomainResult<bool> {
        self.has_any_permission(user_id, &USER_MANAGEMENT_PERMISSIONS)
            .await
    }

    pub async fn can_view_monitoring(&self, user_id: &str) -> DomainResult<bool> {
        self.has_any_permission(user_id, &MONITORING_PERMISSIONS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::in_memory_provider;
    use crate::domain::NewUser;

    async fn seed_user(
        provider: &Arc<crate::application::services::test_support::InMemoryProvider>,
        username: &str,
        mirrored_role: &str,
    ) -> String {
        provider
            .users()
            .insert(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "x".to_string(),
                role: mirrored_role.to_string(),
                enabled: true,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_effective_permissions_union() {
        let provider = in_memory_provider();
        let service = AuthorizationService::new(provider.clone());

        let view = provider
            .permissions()
            .insert("USER_VIEW", None, "USER_MANAGEMENT")
            .await
            .unwrap();
        let dashboard = provider
            .permissions()
            .insert("DASHBOARD_VIEW", None, "SYSTEM_ADMINISTRATION")
            .await
            .unwrap();

        let role = provider.roles().insert("MODERATOR", None).await.unwrap();
        provider
            .roles()
            .add_permission(&role.id, &view.id)
            .await
            .unwrap();

        let user_id = seed_user(&provider, "alice", "USER").await;
        provider
            .users()
            .assign_role(&user_id, &role.id)
            .await
            .unwrap();
        provider
            .users()
            .grant_permission(&user_id, &dashboard.id)
            .await
            .unwrap();

        let names = service.effective_permission_names(&user_id).await.unwrap();
        assert_eq!(names, vec!["DASHBOARD_VIEW", "USER_VIEW"]);

        assert!(service.has_permission(&user_id, "USER_VIEW").await.unwrap());
        assert!(!service.has_permission(&user_id, "USER_DELETE").await.unwrap());
        assert!(service
            .has_all_permissions(&user_id, &["USER_VIEW", "DASHBOARD_VIEW"])
            .await
            .unwrap());
        assert!(!service
            .has_all_permissions(&user_id, &["USER_VIEW", "USER_DELETE"])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_has_role_checks_mirror_and_assignments() {
        let provider = in_memory_provider();
        let service = AuthorizationService::new(provider.clone());

        // Mirror only, no join rows
        let legacy = seed_user(&provider, "legacy", "ADMIN").await;
        assert!(service.has_role(&legacy, "ADMIN").await.unwrap());

        // Join row only, mirror says USER
        let role = provider.roles().insert("MODERATOR", None).await.unwrap();
        let assigned = seed_user(&provider, "assigned", "USER").await;
        provider
            .users()
            .assign_role(&assigned, &role.id)
            .await
            .unwrap();
        assert!(service.has_role(&assigned, "MODERATOR").await.unwrap());
        assert!(!service.has_role(&assigned, "ADMIN").await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let provider = in_memory_provider();
        let service = AuthorizationService::new(provider.clone());

        let admin = seed_user(&provider, "admin", "ADMIN").await;
        assert!(service.can_access_admin(&admin).await.unwrap());

        let plain = seed_user(&provider, "plain", "USER").await;
        assert!(!service.can_access_admin(&plain).await.unwrap());

        // DASHBOARD_VIEW alone opens the dashboard
        let dashboard = provider
            .permissions()
            .insert("DASHBOARD_VIEW", None, "SYSTEM_ADMINISTRATION")
            .await
            .unwrap();
        provider
            .users()
            .grant_permission(&plain, &dashboard.id)
            .await
            .unwrap();
        assert!(service.can_access_admin(&plain).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_owner_or_admin() {
        let provider = in_memory_provider();
        let service = AuthorizationService::new(provider.clone());

        let admin = seed_user(&provider, "admin", "ADMIN").await;
        let alice = seed_user(&provider, "alice", "USER").await;
        let bob = seed_user(&provider, "bob", "USER").await;

        assert!(service.is_owner_or_admin(&alice, &alice).await.unwrap());
        assert!(service.is_owner_or_admin(&admin, &alice).await.unwrap());
        assert!(!service.is_owner_or_admin(&bob, &alice).await.unwrap());
    }
}
