pub mod permission_repository;
pub mod repository_provider;
pub mod reset_token_repository;
pub mod role_repository;
pub mod user_repository;

pub use permission_repository::SeaOrmPermissionRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use reset_token_repository::SeaOrmResetTokenRepository;
pub use role_repository::SeaOrmRoleRepository;
pub use user_repository::SeaOrmUserRepository;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{permission, role_permission};

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Validation(format!("Database error: {}", e))
}

/// Maps UNIQUE constraint violations to a Conflict, everything else to db_err.
pub(crate) fn unique_violation(e: sea_orm::DbErr, conflict: &str) -> DomainError {
    let message = e.to_string();
    if message.contains("UNIQUE") || message.contains("duplicate") {
        DomainError::Conflict(conflict.to_string())
    } else {
        db_err(e)
    }
}

/// Resolves permission names attached to a role, sorted by name.
pub(crate) async fn load_role_permission_names(
    db: &DatabaseConnection,
    role_id: &str,
) -> DomainResult<Vec<String>> {
    let permission_ids: Vec<String> = role_permission::Entity::find()
        .filter(role_permission::Column::RoleId.eq(role_id))
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|rp| rp.permission_id)
        .collect();

    if permission_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = permission::Entity::find()
        .filter(permission::Column::Id.is_in(permission_ids))
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|p| p.name)
        .collect();

    names.sort();

    Ok(names)
}
