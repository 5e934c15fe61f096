//! Database entities module

pub mod password_reset_token;
pub mod permission;
pub mod role;
pub mod role_permission;
pub mod user;
pub mod user_permission;
pub mod user_role;

pub use password_reset_token::Entity as PasswordResetToken;
pub use permission::Entity as Permission;
pub use role::Entity as Role;
pub use role_permission::Entity as RolePermission;
pub use user::Entity as User;
pub use user_permission::Entity as UserPermission;
pub use user_role::Entity as UserRole;
