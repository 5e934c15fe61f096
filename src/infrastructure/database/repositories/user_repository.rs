use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::{
    DomainError, DomainResult, NewUser, Permission, Role, User, UserFilter, UserRepository,
    UserStats, UserUpdate,
};
use crate::infrastructure::database::entities::{permission, role, user, user_permission, user_role};
use crate::infrastructure::database::repositories::{db_err, load_role_permission_names, unique_violation};
use crate::shared::types::pagination::{PageRequest, PaginatedResult};

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn require_model(&self, id: &str) -> DomainResult<user::Model> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        role: model.role,
        enabled: model.enabled,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    }
}

fn permission_model_to_domain(model: permission::Model) -> Permission {
    Permission {
        id: model.id,
        name: model.name,
        description: model.description,
        category: model.category,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn insert(&self, new: NewUser) -> DomainResult<User> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(new.username),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            role: Set(new.role),
            enabled: Set(new.enabled),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
        };

        let inserted = model
            .insert(&self.db)
            .await
            .map_err(|e| unique_violation(e, "Username or email already exists"))?;

        Ok(user_model_to_domain(inserted))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_login(&self, login: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(
                user::Column::Username
                    .eq(login)
                    .or(user::Column::Email.eq(login)),
            )
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn list(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<User>> {
        let mut query = user::Entity::find();

        // Search matches username or email
        if let Some(ref search) = filter.search {
            query = query.filter(
                user::Column::Username
                    .contains(search)
                    .or(user::Column::Email.contains(search)),
            );
        }

        if let Some(ref role) = filter.role {
            query = query.filter(user::Column::Role.eq(role.as_str()));
        }

        if let Some(enabled) = filter.enabled {
            query = query.filter(user::Column::Enabled.eq(enabled));
        }

        match filter.sort_by.as_deref() {
            Some("username") => {
                query = query.order_by_asc(user::Column::Username);
            }
            Some("email") => {
                query = query.order_by_asc(user::Column::Email);
            }
            Some("last_login_at") => {
                query = query.order_by_desc(user::Column::LastLoginAt);
            }
            _ => {
                query = query.order_by_desc(user::Column::CreatedAt);
            }
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let models = query
            .offset(page.offset())
            .limit(page.limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let items: Vec<User> = models.into_iter().map(user_model_to_domain).collect();

        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn update(&self, id: &str, update: UserUpdate) -> DomainResult<User> {
        let existing = self.require_model(id).await?;
        let mut active: user::ActiveModel = existing.into();

        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(enabled) = update.enabled {
            active.enabled = Set(enabled);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| unique_violation(e, "Username or email already exists"))?;

        Ok(user_model_to_domain(updated))
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> DomainResult<()> {
        let existing = self.require_model(id).await?;
        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(password_hash.to_string());
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let existing = self.require_model(id).await?;
        let mut active: user::ActiveModel = existing.into();
        active.last_login_at = Set(Some(at));
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    async fn set_primary_role(&self, id: &str, role: &str) -> DomainResult<()> {
        let existing = self.require_model(id).await?;
        let mut active: user::ActiveModel = existing.into();
        active.role = Set(role.to_string());
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = user::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            });
        }

        Ok(())
    }

    async fn stats(&self) -> DomainResult<UserStats> {
        let total = user::Entity::find().count(&self.db).await.map_err(db_err)?;
        let active = user::Entity::find()
            .filter(user::Column::Enabled.eq(true))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        let admins = user::Entity::find()
            .filter(user::Column::Role.eq("ADMIN"))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        Ok(UserStats {
            total,
            active,
            inactive: total - active,
            admins,
        })
    }

    async fn roles_of(&self, user_id: &str) -> DomainResult<Vec<Role>> {
        let role_ids: Vec<String> = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|r| r.role_id)
            .collect();

        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = role::Entity::find()
            .filter(role::Column::Id.is_in(role_ids))
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut roles = Vec::with_capacity(models.len());
        for model in models {
            let permissions = load_role_permission_names(&self.db, &model.id).await?;
            roles.push(Role {
                id: model.id,
                name: model.name,
                description: model.description,
                permissions,
                created_at: model.created_at,
                updated_at: model.updated_at,
            });
        }

        Ok(roles)
    }

    async fn assign_role(&self, user_id: &str, role_id: &str) -> DomainResult<()> {
        let exists = user_role::Entity::find_by_id((user_id.to_string(), role_id.to_string()))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if exists.is_some() {
            return Ok(());
        }

        user_role::ActiveModel {
            user_id: Set(user_id.to_string()),
            role_id: Set(role_id.to_string()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn remove_role(&self, user_id: &str, role_id: &str) -> DomainResult<()> {
        user_role::Entity::delete_by_id((user_id.to_string(), role_id.to_string()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn replace_roles(&self, user_id: &str, role_ids: &[String]) -> DomainResult<()> {
        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if role_ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<user_role::ActiveModel> = role_ids
            .iter()
            .map(|role_id| user_role::ActiveModel {
                user_id: Set(user_id.to_string()),
                role_id: Set(role_id.clone()),
            })
            .collect();

        user_role::Entity::insert_many(rows)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn direct_permissions_of(&self, user_id: &str) -> DomainResult<Vec<Permission>> {
        let permission_ids: Vec<String> = user_permission::Entity::find()
            .filter(user_permission::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|p| p.permission_id)
            .collect();

        if permission_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = permission::Entity::find()
            .filter(permission::Column::Id.is_in(permission_ids))
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(permission_model_to_domain).collect())
    }

    async fn grant_permission(&self, user_id: &str, permission_id: &str) -> DomainResult<()> {
        let exists = user_permission::Entity::find_by_id((
            user_id.to_string(),
            permission_id.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(db_err)?;

        if exists.is_some() {
            return Ok(());
        }

        user_permission::ActiveModel {
            user_id: Set(user_id.to_string()),
            permission_id: Set(permission_id.to_string()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn revoke_permission(&self, user_id: &str, permission_id: &str) -> DomainResult<()> {
        user_permission::Entity::delete_by_id((
            user_id.to_string(),
            permission_id.to_string(),
        ))
        .exec(&self.db)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
