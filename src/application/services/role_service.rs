//! Role management business logic

use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, DomainResult, RepositoryProvider, Role};
use crate::shared::validations::validate_grant_name;

/// Service for role CRUD and role permission wiring
pub struct RoleService {
    repos: Arc<dyn RepositoryProvider>,
}

impl RoleService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Creates a role and attaches the named permissions.
    pub async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
        permission_names: &[String],
    ) -> DomainResult<Role> {
        validate_grant_name(name)?;

        let permission_ids = self.resolve_permission_ids(permission_names).await?;

        let role = self.repos.roles().insert(name, description).await?;

        if !permission_ids.is_empty() {
            self.repos
                .roles()
                .set_permissions(&role.id, &permission_ids)
                .await?;
        }

        info!("Role created: {}", role.name);

        self.get_role(&role.id).await
    }

    pub async fn get_role(&self, id: &str) -> DomainResult<Role> {
        self.repos
            .roles()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Role",
                field: "id",
                value: id.to_string(),
            })
    }

    pub async fn get_by_name(&self, name: &str) -> DomainResult<Role> {
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

    pub async fn list_roles(&self) -> DomainResult<Vec<Role>> {
        self.repos.roles().list().await
    }

    /// Updates the description and, when given, rewrites the permission set.
    pub async fn update_role(
        &self,
        id: &str,
        description: Option<&str>,
        permission_names: Option<&[String]>,
    ) -> DomainResult<Role> {
        self.repos.roles().update(id, description).await?;

        if let Some(names) = permission_names {
            let permission_ids = self.resolve_permission_ids(names).await?;
            self.repos
                .roles()
                .set_permissions(id, &permission_ids)
                .await?;
        }

        self.get_role(id).await
    }

    /// Deletes a role. Refused while users still hold it.
    pub async fn delete_role(&self, id: &str) -> DomainResult<()> {
        let role = self.get_role(id).await?;

        let assigned = self.repos.roles().assigned_user_count(id).await?;
        if assigned > 0 {
            return Err(DomainError::Conflict(format!(
                "Role {} is assigned to {} user(s)",
                role.name, assigned
            )));
        }

        self.repos.roles().delete(id).await?;

        info!("Role deleted: {}", role.name);

        Ok(())
    }

    pub async fn add_permission(&self, role_id: &str, permission_name: &str) -> DomainResult<Role> {
        let permission = self.require_permission(permission_name).await?;
        self.repos
            .roles()
            .add_permission(role_id, &permission.id)
            .await?;

        self.get_role(role_id).await
    }

    pub async fn remove_permission(
        &self,
        role_id: &str,
        permission_name: &str,
    ) -> DomainResult<Role> {
        let permission = self.require_permission(permission_name).await?;
        self.repos
            .roles()
            .remove_permission(role_id, &permission.id)
            .await?;

        self.get_role(role_id).await
    }

    async fn require_permission(
        &self,
        name: &str,
    ) -> DomainResult<crate::domain::Permission> {
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

    async fn resolve_permission_ids(&self, names: &[String]) -> DomainResult<Vec<String>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            ids.push(self.require_permission(name).await?.id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::in_memory_provider;

    #[tokio::test]
    async fn test_create_role_with_permissions() {
        let provider = in_memory_provider();
        let service = RoleService::new(provider.clone());

        provider
            .permissions()
            .insert("USER_VIEW", None, "USER_MANAGEMENT")
            .await
            .unwrap();
        provider
            .permissions()
            .insert("USER_UPDATE", None, "USER_MANAGEMENT")
            .await
            .unwrap();

        let role = service
            .create_role(
                "MODERATOR",
                Some("Content Moderator"),
                &["USER_VIEW".to_string(), "USER_UPDATE".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(role.name, "MODERATOR");
        assert_eq!(role.permissions, vec!["USER_UPDATE", "USER_VIEW"]);
    }

    #[tokio::test]
    async fn test_create_role_rejects_unknown_permission() {
        let service = RoleService::new(in_memory_provider());

        let err = service
            .create_role("MODERATOR", None, &["NO_SUCH_GRANT".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_role_rejects_bad_name() {
        let service = RoleService::new(in_memory_provider());

        let err = service
            .create_role("not-a-role", None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_refused_while_assigned() {
        let provider = in_memory_provider();
        let service = RoleService::new(provider.clone());

        let role = service.create_role("MODERATOR", None, &[]).await.unwrap();

        provider
            .users()
            .insert(crate::domain::NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "x".to_string(),
                role: "MODERATOR".to_string(),
                enabled: true,
            })
            .await
            .unwrap();
        let user = provider
            .users()
            .find_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        provider
            .users()
            .assign_role(&user.id, &role.id)
            .await
            .unwrap();

        let err = service.delete_role(&role.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        provider
            .users()
            .remove_role(&user.id, &role.id)
            .await
            .unwrap();
        service.delete_role(&role.id).await.unwrap();
    }
}
