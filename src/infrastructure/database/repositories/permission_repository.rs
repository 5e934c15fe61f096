use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::{DomainError, DomainResult, Permission, PermissionRepository};
use crate::infrastructure::database::entities::{
    permission, role_permission, user_permission, user_role,
};
use crate::infrastructure::database::repositories::{db_err, unique_violation};

pub struct SeaOrmPermissionRepository {
    db: DatabaseConnection,
}

impl SeaOrmPermissionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(model: permission::Model) -> Permission {
    Permission {
        id: model.id,
        name: model.name,
        description: model.description,
        category: model.category,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl PermissionRepository for SeaOrmPermissionRepository {
    async fn insert(
        &self,
        name: &str,
        description: Option<&str>,
        category: &str,
    ) -> DomainResult<Permission> {
        let now = Utc::now();
        let model = permission::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(name.to_string()),
            description: Set(description.map(|d| d.to_string())),
            category: Set(category.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model
            .insert(&self.db)
            .await
            .map_err(|e| unique_violation(e, "Permission name already exists"))?;

        Ok(model_to_domain(inserted))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Permission>> {
        let model = permission::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(model_to_domain))
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Permission>> {
        let model = permission::Entity::find()
            .filter(permission::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(model_to_domain))
    }

    async fn list(&self, category: Option<&str>) -> DomainResult<Vec<Permission>> {
        let mut query = permission::Entity::find();

        if let Some(category) = category {
            query = query.filter(permission::Column::Category.eq(category));
        }

        let models = query
            .order_by_asc(permission::Column::Category)
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn categories(&self) -> DomainResult<Vec<String>> {
        permission::Entity::find()
            .select_only()
            .column(permission::Column::Category)
            .distinct()
            .order_by_asc(permission::Column::Category)
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn update(
        &self,
        id: &str,
        description: Option<&str>,
        category: Option<&str>,
    ) -> DomainResult<Permission> {
        let existing = permission::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Permission",
                field: "id",
                value: id.to_string(),
            })?;

        let mut active: permission::ActiveModel = existing.into();
        if let Some(description) = description {
            active.description = Set(Some(description.to_string()));
        }
        if let Some(category) = category {
            active.category = Set(category.to_string());
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(db_err)?;

        Ok(model_to_domain(updated))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = permission::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "Permission",
                field: "id",
                value: id.to_string(),
            });
        }

        Ok(())
    }

    async fn usage_count(&self, id: &str) -> DomainResult<u64> {
        let by_roles = role_permission::Entity::find()
            .filter(role_permission::Column::PermissionId.eq(id))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        let by_users = user_permission::Entity::find()
            .filter(user_permission::Column::PermissionId.eq(id))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        Ok(by_roles + by_users)
    }

    async fn effective_for_user(&self, user_id: &str) -> DomainResult<Vec<Permission>> {
        // Directly granted
        let mut permission_ids: Vec<String> = user_permission::Entity::find()
            .filter(user_permission::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|p| p.permission_id)
            .collect();

        // Inherited through assigned roles
        let role_ids: Vec<String> = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|r| r.role_id)
            .collect();

        if !role_ids.is_empty() {
            let inherited: Vec<String> = role_permission::Entity::find()
                .filter(role_permission::Column::RoleId.is_in(role_ids))
                .all(&self.db)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(|rp| rp.permission_id)
                .collect();

            permission_ids.extend(inherited);
        }

        permission_ids.sort();
        permission_ids.dedup();

        if permission_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = permission::Entity::find()
            .filter(permission::Column::Id.is_in(permission_ids))
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
