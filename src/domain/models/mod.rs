pub mod permission;
pub mod reset_token;
pub mod role;
pub mod user;

pub use permission::Permission;
pub use reset_token::ResetToken;
pub use role::Role;
pub use user::{NewUser, User, UserFilter, UserStats, UserUpdate};
