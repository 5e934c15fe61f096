//! # Core Auth
//!
//! Drop-in authentication and user management service: JWT login,
//! registration, password reset over email, role and permission based
//! access control and an admin dashboard API.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, types and repository traits
//! - **application**: Business logic services (users, roles, permissions, password reset)
//! - **infrastructure**: SeaORM persistence, migrations and repository implementations
//! - **api**: REST API with Swagger documentation
//! - **auth**: JWT tokens, password hashing and the route guards
//! - **mail**: Outgoing notifications for the password reset flow
//! - **observability**: In-memory log buffer for the dashboard, optional Prometheus metrics

pub mod api;
pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod mail;
pub mod observability;
pub mod shared;

pub use config::{default_config_path, AuthConfig};

// Re-export database types for easy access
pub use infrastructure::{
    init_database, DatabaseConfig, Migrator, MigratorTrait, SeaOrmRepositoryProvider,
};

// The host must install the recorder from the same crate version the
// router renders, so the exporter is re-exported rather than re-declared.
#[cfg(feature = "metrics")]
pub use metrics_exporter_prometheus;

// Re-export API router
pub use api::{create_api_router, ApiContext};

// Re-export bootstrap and maintenance helpers used at startup
pub use application::{create_default_admin, seed_defaults, SweeperConfig, TokenSweeper};

// Re-export the log plumbing the host wires into tracing-subscriber
pub use observability::{BufferLayer, LogBuffer};

pub use shared::shutdown::{listen_for_shutdown_signals, ShutdownCoordinator, ShutdownSignal};
