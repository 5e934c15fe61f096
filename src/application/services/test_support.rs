//! In-memory repository doubles for service tests.
//!
//! Mirrors the SQL implementations closely enough that service tests
//! exercise real flow logic: unique checks, cascading deletes and the
//! hydration of role permission names all behave like the database layer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    DomainError, DomainResult, NewUser, Permission, PermissionRepository, RepositoryProvider,
    ResetToken, ResetTokenRepository, Role, RoleRepository, User, UserFilter, UserRepository,
    UserStats, UserUpdate,
};
use crate::shared::types::pagination::{PageRequest, PaginatedResult};

pub(crate) fn in_memory_provider() -> Arc<InMemoryProvider> {
    Arc::new(InMemoryProvider::new())
}

#[derive(Default)]
struct Store {
    users: Vec<User>,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    user_roles: Vec<(String, String)>,
    user_permissions: Vec<(String, String)>,
    role_permissions: Vec<(String, String)>,
    tokens: Vec<ResetToken>,
}

impl Store {
    fn permission_names_for_role(&self, role_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .role_permissions
            .iter()
            .filter(|(rid, _)| rid == role_id)
            .filter_map(|(_, pid)| {
                self.permissions
                    .iter()
                    .find(|p| &p.id == pid)
                    .map(|p| p.name.clone())
            })
            .collect();
        names.sort();
        names
    }

    fn hydrated_role(&self, role: &Role) -> Role {
        let mut hydrated = role.clone();
        hydrated.permissions = self.permission_names_for_role(&role.id);
        hydrated
    }
}

pub(crate) struct InMemoryProvider {
    users: InMemoryUsers,
    roles: InMemoryRoles,
    permissions: InMemoryPermissions,
    tokens: InMemoryTokens,
}

impl InMemoryProvider {
    /// Test hook: the service generates token strings internally, tests
    /// need to fish them back out.
    pub(crate) fn latest_token_for(&self, user_id: &str) -> Option<ResetToken> {
        let store = self.tokens.store.lock().unwrap();
        store
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .last()
            .cloned()
    }

    fn new() -> Self {
        let store = Arc::new(Mutex::new(Store::default()));
        Self {
            users: InMemoryUsers {
                store: store.clone(),
            },
            roles: InMemoryRoles {
                store: store.clone(),
            },
            permissions: InMemoryPermissions {
                store: store.clone(),
            },
            tokens: InMemoryTokens { store },
        }
    }
}

impl RepositoryProvider for InMemoryProvider {
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
        &self.tokens
    }
}

struct InMemoryUsers {
    store: Arc<Mutex<Store>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, new: NewUser) -> DomainResult<User> {
        let mut store = self.store.lock().unwrap();

        if store
            .users
            .iter()
            .any(|u| u.username == new.username || u.email == new.email)
        {
            return Err(DomainError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            enabled: new.enabled,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        store.users.push(user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_login(&self, login: &str) -> DomainResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .find(|u| u.username == login || u.email == login)
            .cloned())
    }

    async fn list(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<User>> {
        let store = self.store.lock().unwrap();

        let mut matched: Vec<User> = store
            .users
            .iter()
            .filter(|u| {
                if let Some(ref search) = filter.search {
                    if !u.username.contains(search) && !u.email.contains(search) {
                        return false;
                    }
                }
                if let Some(ref role) = filter.role {
                    if &u.role != role {
                        return false;
                    }
                }
                if let Some(enabled) = filter.enabled {
                    if u.enabled != enabled {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        match filter.sort_by.as_deref() {
            Some("username") => matched.sort_by(|a, b| a.username.cmp(&b.username)),
            Some("email") => matched.sort_by(|a, b| a.email.cmp(&b.email)),
            Some("last_login_at") => {
                matched.sort_by(|a, b| b.last_login_at.cmp(&a.last_login_at))
            }
            _ => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        let total = matched.len() as u64;
        let items: Vec<User> = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn update(&self, id: &str, update: UserUpdate) -> DomainResult<User> {
        let mut store = self.store.lock().unwrap();

        if let Some(ref email) = update.email {
            if store.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(DomainError::Conflict(
                    "Username or email already exists".to_string(),
                ));
            }
        }

        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })?;

        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(enabled) = update.enabled {
            user.enabled = enabled;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })?;
        user.last_login_at = Some(at);
        Ok(())
    }

    async fn set_primary_role(&self, id: &str, role: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })?;
        user.role = role.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.users.len();
        store.users.retain(|u| u.id != id);
        if store.users.len() == before {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            });
        }
        // FK cascades
        store.user_roles.retain(|(uid, _)| uid != id);
        store.user_permissions.retain(|(uid, _)| uid != id);
        store.tokens.retain(|t| t.user_id != id);
        Ok(())
    }

    async fn stats(&self) -> DomainResult<UserStats> {
        let store = self.store.lock().unwrap();
        let total = store.users.len() as u64;
        let active = store.users.iter().filter(|u| u.enabled).count() as u64;
        let admins = store.users.iter().filter(|u| u.role == "ADMIN").count() as u64;
        Ok(UserStats {
            total,
            active,
            inactive: total - active,
            admins,
        })
    }

    async fn roles_of(&self, user_id: &str) -> DomainResult<Vec<Role>> {
        let store = self.store.lock().unwrap();
        let mut roles: Vec<Role> = store
            .user_roles
            .iter()
            .filter(|(uid, _)| uid == user_id)
            .filter_map(|(_, rid)| store.roles.iter().find(|r| &r.id == rid))
            .map(|r| store.hydrated_role(r))
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn assign_role(&self, user_id: &str, role_id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let pair = (user_id.to_string(), role_id.to_string());
        if !store.user_roles.contains(&pair) {
            store.user_roles.push(pair);
        }
        Ok(())
    }

    async fn remove_role(&self, user_id: &str, role_id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        store
            .user_roles
            .retain(|(uid, rid)| !(uid == user_id && rid == role_id));
        Ok(())
    }

    async fn replace_roles(&self, user_id: &str, role_ids: &[String]) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        store.user_roles.retain(|(uid, _)| uid != user_id);
        for role_id in role_ids {
            store
                .user_roles
                .push((user_id.to_string(), role_id.clone()));
        }
        Ok(())
    }

    async fn direct_permissions_of(&self, user_id: &str) -> DomainResult<Vec<Permission>> {
        let store = self.store.lock().unwrap();
        let mut permissions: Vec<Permission> = store
            .user_permissions
            .iter()
            .filter(|(uid, _)| uid == user_id)
            .filter_map(|(_, pid)| store.permissions.iter().find(|p| &p.id == pid).cloned())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn grant_permission(&self, user_id: &str, permission_id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let pair = (user_id.to_string(), permission_id.to_string());
        if !store.user_permissions.contains(&pair) {
            store.user_permissions.push(pair);
        }
        Ok(())
    }

    async fn revoke_permission(&self, user_id: &str, permission_id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        store
            .user_permissions
            .retain(|(uid, pid)| !(uid == user_id && pid == permission_id));
        Ok(())
    }
}

struct InMemoryRoles {
    store: Arc<Mutex<Store>>,
}

#[async_trait]
impl RoleRepository for InMemoryRoles {
    async fn insert(&self, name: &str, description: Option<&str>) -> DomainResult<Role> {
        let mut store = self.store.lock().unwrap();

        if store.roles.iter().any(|r| r.name == name) {
            return Err(DomainError::Conflict("Role name already exists".to_string()));
        }

        let now = Utc::now();
        let role = Role {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        store.roles.push(role.clone());

        Ok(role)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Role>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .roles
            .iter()
            .find(|r| r.id == id)
            .map(|r| store.hydrated_role(r)))
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .roles
            .iter()
            .find(|r| r.name == name)
            .map(|r| store.hydrated_role(r)))
    }

    async fn list(&self) -> DomainResult<Vec<Role>> {
        let store = self.store.lock().unwrap();
        let mut roles: Vec<Role> = store
            .roles
            .iter()
            .map(|r| store.hydrated_role(r))
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn update(&self, id: &str, description: Option<&str>) -> DomainResult<Role> {
        let mut store = self.store.lock().unwrap();
        let role = store
            .roles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "Role",
                field: "id",
                value: id.to_string(),
            })?;
        role.description = description.map(|d| d.to_string());
        role.updated_at = Utc::now();
        let updated = role.clone();
        Ok(store.hydrated_role(&updated))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.roles.len();
        store.roles.retain(|r| r.id != id);
        if store.roles.len() == before {
            return Err(DomainError::NotFound {
                entity: "Role",
                field: "id",
                value: id.to_string(),
            });
        }
        store.user_roles.retain(|(_, rid)| rid != id);
        store.role_permissions.retain(|(rid, _)| rid != id);
        Ok(())
    }

    async fn assigned_user_count(&self, id: &str) -> DomainResult<u64> {
        let store = self.store.lock().unwrap();
        Ok(store.user_roles.iter().filter(|(_, rid)| rid == id).count() as u64)
    }

    async fn set_permissions(&self, id: &str, permission_ids: &[String]) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        store.role_permissions.retain(|(rid, _)| rid != id);
        for permission_id in permission_ids {
            store
                .role_permissions
                .push((id.to_string(), permission_id.clone()));
        }
        Ok(())
    }

    async fn add_permission(&self, id: &str, permission_id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let pair = (id.to_string(), permission_id.to_string());
        if !store.role_permissions.contains(&pair) {
            store.role_permissions.push(pair);
        }
        Ok(())
    }

    async fn remove_permission(&self, id: &str, permission_id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        store
            .role_permissions
            .retain(|(rid, pid)| !(rid == id && pid == permission_id));
        Ok(())
    }
}

struct InMemoryPermissions {
    store: Arc<Mutex<Store>>,
}

#[async_trait]
impl PermissionRepository for InMemoryPermissions {
    async fn insert(
        &self,
        name: &str,
        description: Option<&str>,
        category: &str,
    ) -> DomainResult<Permission> {
        let mut store = self.store.lock().unwrap();

        if store.permissions.iter().any(|p| p.name == name) {
            return Err(DomainError::Conflict(
                "Permission name already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let permission = Permission {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            category: category.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.permissions.push(permission.clone());

        Ok(permission)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Permission>> {
        let store = self.store.lock().unwrap();
        Ok(store.permissions.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Permission>> {
        let store = self.store.lock().unwrap();
        Ok(store.permissions.iter().find(|p| p.name == name).cloned())
    }

    async fn list(&self, category: Option<&str>) -> DomainResult<Vec<Permission>> {
        let store = self.store.lock().unwrap();
        let mut permissions: Vec<Permission> = store
            .permissions
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        Ok(permissions)
    }

    async fn categories(&self) -> DomainResult<Vec<String>> {
        let store = self.store.lock().unwrap();
        let mut categories: Vec<String> = store
            .permissions
            .iter()
            .map(|p| p.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn update(
        &self,
        id: &str,
        description: Option<&str>,
        category: Option<&str>,
    ) -> DomainResult<Permission> {
        let mut store = self.store.lock().unwrap();
        let permission = store
            .permissions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "Permission",
                field: "id",
                value: id.to_string(),
            })?;
        if let Some(description) = description {
            permission.description = Some(description.to_string());
        }
        if let Some(category) = category {
            permission.category = category.to_string();
        }
        permission.updated_at = Utc::now();
        Ok(permission.clone())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.permissions.len();
        store.permissions.retain(|p| p.id != id);
        if store.permissions.len() == before {
            return Err(DomainError::NotFound {
                entity: "Permission",
                field: "id",
                value: id.to_string(),
            });
        }
        store.user_permissions.retain(|(_, pid)| pid != id);
        store.role_permissions.retain(|(_, pid)| pid != id);
        Ok(())
    }

    async fn usage_count(&self, id: &str) -> DomainResult<u64> {
        let store = self.store.lock().unwrap();
        let by_roles = store
            .role_permissions
            .iter()
            .filter(|(_, pid)| pid == id)
            .count();
        let by_users = store
            .user_permissions
            .iter()
            .filter(|(_, pid)| pid == id)
            .count();
        Ok((by_roles + by_users) as u64)
    }

    async fn effective_for_user(&self, user_id: &str) -> DomainResult<Vec<Permission>> {
        let store = self.store.lock().unwrap();

        let mut ids: Vec<String> = store
            .user_permissions
            .iter()
            .filter(|(uid, _)| uid == user_id)
            .map(|(_, pid)| pid.clone())
            .collect();

        let role_ids: Vec<&String> = store
            .user_roles
            .iter()
            .filter(|(uid, _)| uid == user_id)
            .map(|(_, rid)| rid)
            .collect();

        ids.extend(
            store
                .role_permissions
                .iter()
                .filter(|(rid, _)| role_ids.contains(&rid))
                .map(|(_, pid)| pid.clone()),
        );

        ids.sort();
        ids.dedup();

        let mut permissions: Vec<Permission> = ids
            .iter()
            .filter_map(|pid| store.permissions.iter().find(|p| &p.id == pid).cloned())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(permissions)
    }
}

struct InMemoryTokens {
    store: Arc<Mutex<Store>>,
}

#[async_trait]
impl ResetTokenRepository for InMemoryTokens {
    async fn insert(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<ResetToken> {
        let mut store = self.store.lock().unwrap();
        let reset = ResetToken {
            id: uuid::Uuid::new_v4().to_string(),
            token: token.to_string(),
            user_id: user_id.to_string(),
            expires_at,
            used: false,
            created_at: Utc::now(),
        };
        store.tokens.push(reset.clone());
        Ok(reset)
    }

    async fn find_by_token(&self, token: &str) -> DomainResult<Option<ResetToken>> {
        let store = self.store.lock().unwrap();
        Ok(store.tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn mark_used(&self, id: &str) -> DomainResult<()> {
        let mut store = self.store.lock().unwrap();
        let token = store
            .tokens
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "ResetToken",
                field: "id",
                value: id.to_string(),
            })?;
        token.used = true;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> DomainResult<u64> {
        let mut store = self.store.lock().unwrap();
        let before = store.tokens.len();
        store.tokens.retain(|t| t.user_id != user_id);
        Ok((before - store.tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let mut store = self.store.lock().unwrap();
        let before = store.tokens.len();
        store.tokens.retain(|t| t.expires_at > now && !t.used);
        Ok((before - store.tokens.len()) as u64)
    }
}
