//! Permission management business logic

use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, DomainResult, Permission, RepositoryProvider};
use crate::shared::validations::validate_grant_name;

/// Service for the permission catalogue
pub struct PermissionService {
    repos: Arc<dyn RepositoryProvider>,
}

impl PermissionService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
        category: &str,
    ) -> DomainResult<Permission> {
        validate_grant_name(name)?;
        validate_grant_name(category)?;

        let permission = self
            .repos
            .permissions()
            .insert(name, description, category)
            .await?;

        info!("Permission created: {} ({})", permission.name, permission.category);

        Ok(permission)
    }

    pub async fn get_permission(&self, id: &str) -> DomainResult<Permission> {
        self.repos
            .permissions()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Permission",
                field: "id",
                value: id.to_string(),
            })
    }

    pub async fn get_by_name(&self, name: &str) -> DomainResult<Permission> {
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

    /// Lists the catalogue, optionally narrowed to one category.
    pub async fn list_permissions(&self, category: Option<&str>) -> DomainResult<Vec<Permission>> {
        self.repos.permissions().list(category).await
    }

    pub async fn categories(&self) -> DomainResult<Vec<String>> {
        self.repos.permissions().categories().await
    }

    pub async fn update_permission(
        &self,
        id: &str,
        description: Option<&str>,
        category: Option<&str>,
    ) -> DomainResult<Permission> {
        if let Some(category) = category {
            validate_grant_name(category)?;
        }

        self.repos
            .permissions()
            .update(id, description, category)
            .await
    }

    /// Deletes a permission. Refused while roles or users reference it.
    pub async fn delete_permission(&self, id: &str) -> DomainResult<()> {
        let permission = self.get_permission(id).await?;

        let usage = self.repos.permissions().usage_count(id).await?;
        if usage > 0 {
            return Err(DomainError::Conflict(format!(
                "Permission {} is referenced by {} role(s) or user(s)",
                permission.name, usage
            )));
        }

        self.repos.permissions().delete(id).await?;

        info!("Permission deleted: {}", permission.name);

        Ok(())
    }
}
