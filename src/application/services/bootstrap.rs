//! First-run data seeding.
//!
//! Permissions and roles are only created while their tables are empty, so
//! operator changes survive restarts. Role permission wiring is additive
//! and re-applied on every start, which lets upgrades introduce new grants.

use tracing::{debug, info, warn};

use crate::auth::password::hash_password;
use crate::config::AdminConfig;
use crate::domain::{DomainError, DomainResult, NewUser, RepositoryProvider};

/// The built-in permission catalogue: (name, description, category).
pub const DEFAULT_PERMISSIONS: [(&str, &str, &str); 22] = [
    ("USER_VIEW", "View user information", "USER_MANAGEMENT"),
    ("USER_CREATE", "Create new users", "USER_MANAGEMENT"),
    ("USER_UPDATE", "Update user information", "USER_MANAGEMENT"),
    ("USER_DELETE", "Delete users", "USER_MANAGEMENT"),
    ("USER_PERMISSION_MANAGEMENT", "Manage user permissions", "USER_MANAGEMENT"),
    ("ROLE_VIEW", "View roles", "ROLE_MANAGEMENT"),
    ("ROLE_CREATE", "Create new roles", "ROLE_MANAGEMENT"),
    ("ROLE_UPDATE", "Update roles", "ROLE_MANAGEMENT"),
    ("ROLE_DELETE", "Delete roles", "ROLE_MANAGEMENT"),
    ("ROLE_PERMISSION_MANAGEMENT", "Manage role permissions", "ROLE_MANAGEMENT"),
    ("MONITOR_HEALTH", "View system health", "SYSTEM_MONITORING"),
    ("MONITOR_METRICS", "View system metrics", "SYSTEM_MONITORING"),
    ("MONITOR_INFO", "View application info", "SYSTEM_MONITORING"),
    ("MONITOR_LOGS", "View application logs", "SYSTEM_MONITORING"),
    ("MONITOR_LOG_STREAM", "Stream application logs", "SYSTEM_MONITORING"),
    ("MONITOR_STATS", "View dashboard statistics", "SYSTEM_MONITORING"),
    ("PERMISSION_VIEW", "View permissions", "PERMISSION_MANAGEMENT"),
    ("PERMISSION_CREATE", "Create new permissions", "PERMISSION_MANAGEMENT"),
    ("PERMISSION_UPDATE", "Update permissions", "PERMISSION_MANAGEMENT"),
    ("PERMISSION_DELETE", "Delete permissions", "PERMISSION_MANAGEMENT"),
    ("SYSTEM_ADMIN", "Full system administration", "SYSTEM_ADMINISTRATION"),
    ("DASHBOARD_VIEW", "View admin dashboard", "SYSTEM_ADMINISTRATION"),
];

/// The built-in roles: (name, description).
pub const DEFAULT_ROLES: [(&str, &str); 3] = [
    ("ADMIN", "System Administrator"),
    ("USER", "Regular User"),
    ("MODERATOR", "Content Moderator"),
];

const USER_ROLE_GRANTS: [&str; 2] = ["DASHBOARD_VIEW", "MONITOR_HEALTH"];

const MODERATOR_ROLE_GRANTS: [&str; 6] = [
    "USER_VIEW",
    "USER_UPDATE",
    "DASHBOARD_VIEW",
    "MONITOR_HEALTH",
    "MONITOR_METRICS",
    "MONITOR_INFO",
];

/// Seeds permissions, roles and role grants.
pub async fn seed_defaults(repos: &dyn RepositoryProvider) -> DomainResult<()> {
    seed_permissions(repos).await?;
    seed_roles(repos).await?;
    assign_role_grants(repos).await?;
    Ok(())
}

async fn seed_permissions(repos: &dyn RepositoryProvider) -> DomainResult<()> {
    if !repos.permissions().list(None).await?.is_empty() {
        return Ok(());
    }

    for (name, description, category) in DEFAULT_PERMISSIONS {
        repos
            .permissions()
            .insert(name, Some(description), category)
            .await?;
    }

    info!("🌱 Seeded {} default permissions", DEFAULT_PERMISSIONS.len());

    Ok(())
}

async fn seed_roles(repos: &dyn RepositoryProvider) -> DomainResult<()> {
    if !repos.roles().list().await?.is_empty() {
        return Ok(());
    }

    for (name, description) in DEFAULT_ROLES {
        repos.roles().insert(name, Some(description)).await?;
    }

    info!("🌱 Seeded {} default roles", DEFAULT_ROLES.len());

    Ok(())
}

async fn assign_role_grants(repos: &dyn RepositoryProvider) -> DomainResult<()> {
    let admin_grants: Vec<&str> = DEFAULT_PERMISSIONS.iter().map(|(name, _, _)| *name).collect();

    grant_missing(repos, "ADMIN", &admin_grants).await?;
    grant_missing(repos, "USER", &USER_ROLE_GRANTS).await?;
    grant_missing(repos, "MODERATOR", &MODERATOR_ROLE_GRANTS).await?;

    Ok(())
}

/// Adds any of `grants` the role does not yet hold. Unknown roles and
/// permissions are skipped, an operator may have removed them on purpose.
async fn grant_missing(
    repos: &dyn RepositoryProvider,
    role_name: &str,
    grants: &[&str],
) -> DomainResult<()> {
    let role = match repos.roles().find_by_name(role_name).await? {
        Some(role) => role,
        None => return Ok(()),
    };

    for grant in grants {
        if role.permissions.iter().any(|p| p == grant) {
            continue;
        }
        if let Some(permission) = repos.permissions().find_by_name(grant).await? {
            repos.roles().add_permission(&role.id, &permission.id).await?;
        }
    }

    Ok(())
}

/// Creates the configured admin account unless one already exists.
/// Returns whether an account was created.
pub async fn create_default_admin(
    repos: &dyn RepositoryProvider,
    config: &AdminConfig,
) -> DomainResult<bool> {
    if !config.create_on_startup {
        debug!("Default admin creation disabled by configuration");
        return Ok(false);
    }

    let username_taken = repos
        .users()
        .find_by_username(&config.username)
        .await?
        .is_some();
    let email_taken = repos.users().find_by_email(&config.email).await?.is_some();

    if username_taken || email_taken {
        debug!("Default admin account already present, skipping creation");
        return Ok(false);
    }

    let password_hash = hash_password(&config.password)
        .map_err(|e| DomainError::Validation(format!("Password hashing failed: {}", e)))?;

    let user = repos
        .users()
        .insert(NewUser {
            username: config.username.clone(),
            email: config.email.clone(),
            password_hash,
            role: "ADMIN".to_string(),
            enabled: true,
        })
        .await?;

    if let Some(role) = repos.roles().find_by_name("ADMIN").await? {
        repos.users().assign_role(&user.id, &role.id).await?;
    }

    info!("👤 Default admin account created: {}", user.username);
    warn!("⚠️ Please change the admin password immediately!");

    Ok(true)
}
