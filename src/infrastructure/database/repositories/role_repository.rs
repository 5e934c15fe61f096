use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{DomainError, DomainResult, Role, RoleRepository};
use crate::infrastructure::database::entities::{role, role_permission, user_role};
use crate::infrastructure::database::repositories::{db_err, load_role_permission_names, unique_violation};

pub struct SeaOrmRoleRepository {
    db: DatabaseConnection,
}

impl SeaOrmRoleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn hydrate(&self, model: role::Model) -> DomainResult<Role> {
        let permissions = load_role_permission_names(&self.db, &model.id).await?;

        Ok(Role {
            id: model.id,
            name: model.name,
            description: model.description,
            permissions,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[async_trait]
impl RoleRepository for SeaOrmRoleRepository {
    async fn insert(&self, name: &str, description: Option<&str>) -> DomainResult<Role> {
        let now = Utc::now();
        let model = role::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(name.to_string()),
            description: Set(description.map(|d| d.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model
            .insert(&self.db)
            .await
            .map_err(|e| unique_violation(e, "Role name already exists"))?;

        self.hydrate(inserted).await
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Role>> {
        let model = role::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match model {
            Some(model) => Ok(Some(self.hydrate(model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        let model = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match model {
            Some(model) => Ok(Some(self.hydrate(model).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> DomainResult<Vec<Role>> {
        let models = role::Entity::find()
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut roles = Vec::with_capacity(models.len());
        for model in models {
            roles.push(self.hydrate(model).await?);
        }

        Ok(roles)
    }

    async fn update(&self, id: &str, description: Option<&str>) -> DomainResult<Role> {
        let existing = role::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Role",
                field: "id",
                value: id.to_string(),
            })?;

        let mut active: role::ActiveModel = existing.into();
        active.description = Set(description.map(|d| d.to_string()));
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(db_err)?;

        self.hydrate(updated).await
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = role::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "Role",
                field: "id",
                value: id.to_string(),
            });
        }

        Ok(())
    }

    async fn assigned_user_count(&self, id: &str) -> DomainResult<u64> {
        user_role::Entity::find()
            .filter(user_role::Column::RoleId.eq(id))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn set_permissions(&self, id: &str, permission_ids: &[String]) -> DomainResult<()> {
        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if permission_ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<role_permission::ActiveModel> = permission_ids
            .iter()
            .map(|permission_id| role_permission::ActiveModel {
                role_id: Set(id.to_string()),
                permission_id: Set(permission_id.clone()),
            })
            .collect();

        role_permission::Entity::insert_many(rows)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn add_permission(&self, id: &str, permission_id: &str) -> DomainResult<()> {
        let exists = role_permission::Entity::find_by_id((
            id.to_string(),
            permission_id.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(db_err)?;

        if exists.is_some() {
            return Ok(());
        }

        role_permission::ActiveModel {
            role_id: Set(id.to_string()),
            permission_id: Set(permission_id.to_string()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn remove_permission(&self, id: &str, permission_id: &str) -> DomainResult<()> {
        role_permission::Entity::delete_by_id((id.to_string(), permission_id.to_string()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}
