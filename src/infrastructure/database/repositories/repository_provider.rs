use sea_orm::DatabaseConnection;

use crate::domain::repositories::{
    PermissionRepository, RepositoryProvider, ResetTokenRepository, RoleRepository,
    UserRepository,
};
use crate::infrastructure::database::repositories::{
    SeaOrmPermissionRepository, SeaOrmResetTokenRepository, SeaOrmRoleRepository,
    SeaOrmUserRepository,
};

/// Bundles the SeaORM repositories behind the domain traits.
pub struct SeaOrmRepositoryProvider {
    users: SeaOrmUserRepository,
    roles: SeaOrmRoleRepository,
    permissions: SeaOrmPermissionRepository,
    reset_tokens: SeaOrmResetTokenRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: SeaOrmUserRepository::new(db.clone()),
            roles: SeaOrmRoleRepository::new(db.clone()),
            permissions: SeaOrmPermissionRepository::new(db.clone()),
            reset_tokens: SeaOrmResetTokenRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn roles(&self) -> &dyn RoleRepository {
        &self.roles
    }

    fn permissions(&self) -> &dyn PermissionRepository {
        &self.permissions
    }

    fn reset_tokens(&self) -> &dyn ResetTokenRepository {
        &self.reset_tokens
    }
}
