pub mod authorization;
pub mod bootstrap;
pub mod maintenance;
pub mod password_reset;
pub mod permission_service;
pub mod role_service;
pub mod user_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use authorization::AuthorizationService;
pub use bootstrap::{create_default_admin, seed_defaults};
pub use maintenance::{SweeperConfig, TokenSweeper};
pub use password_reset::{PasswordResetService, RESET_TOKEN_TTL_HOURS};
pub use permission_service::PermissionService;
pub use role_service::RoleService;
pub use user_service::UserService;
