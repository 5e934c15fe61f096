pub mod services;

pub use services::{
    create_default_admin, seed_defaults, AuthorizationService, PasswordResetService,
    PermissionService, RoleService, SweeperConfig, TokenSweeper, UserService,
};
