pub mod models;
pub mod repositories;

// Re-export commonly used types
pub use models::permission::Permission;
pub use models::reset_token::ResetToken;
pub use models::role::Role;
pub use models::user::{NewUser, User, UserFilter, UserStats, UserUpdate};
pub use repositories::{
    PermissionRepository, RepositoryProvider, ResetTokenRepository, RoleRepository,
    UserRepository,
};

// Re-export the error type for convenience
pub use crate::shared::types::errors::{DomainError, DomainResult};
