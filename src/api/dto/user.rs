//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::models::{User, UserStats};

/// User response DTO
///
/// Never carries the password hash. `roles` is populated on detail
/// endpoints and omitted from list responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "0d9e7a65-7c2b-4c57-9d8f-1f6f2a3b4c5d",
    "username": "alice",
    "email": "alice@example.com",
    "role": "USER",
    "enabled": true,
    "created_at": "2024-01-15T10:30:00Z",
    "updated_at": "2024-01-15T10:30:00Z",
    "last_login_at": "2024-01-15T12:00:00Z"
}))]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Primary role name, mirrored from the role assignments
    pub role: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserDto {
    pub fn from_user(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            enabled: user.enabled,
            roles: None,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login_at: user.last_login_at,
        }
    }

    pub fn with_roles(user: User, roles: Vec<String>) -> Self {
        let mut dto = Self::from_user(user);
        dto.roles = Some(roles);
        dto
    }
}

/// Запрос на создание пользователя (только для администраторов)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "username": "bob",
    "email": "bob@example.com",
    "password": "correct-horse-battery",
    "role": "USER",
    "enabled": true
}))]
pub struct CreateUserRequest {
    /// Имя пользователя (3-50 символов, уникальное)
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    /// Email (уникальный)
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Пароль (8-128 символов)
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
    /// Имя роли. По умолчанию: USER
    pub role: Option<String>,
    /// Активна ли учётная запись. По умолчанию: true
    pub enabled: Option<bool>,
}

/// Запрос на обновление пользователя
///
/// Все поля необязательны, обновляются только переданные.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "bob@new-domain.com",
    "enabled": false
}))]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub enabled: Option<bool>,
    /// Полный набор идентификаторов ролей (замещает текущие назначения)
    pub role_ids: Option<Vec<String>>,
}

/// Запрос на смену пароля пользователя
///
/// `current_password` обязателен, если пользователь меняет свой
/// собственный пароль. Администраторы могут менять чужие пароли
/// без текущего пароля.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "current_password": "old-password-123",
    "new_password": "new-password-456"
}))]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub new_password: String,
}

/// Запрос на замену назначенных ролей пользователя
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "role_ids": ["b3c1...", "e7f2..."]
}))]
pub struct AssignRolesRequest {
    pub role_ids: Vec<String>,
}

/// Сводная статистика по пользователям
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "total": 42,
    "active": 40,
    "inactive": 2,
    "admins": 3
}))]
pub struct UserStatsDto {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub admins: u64,
}

impl From<UserStats> for UserStatsDto {
    fn from(stats: UserStats) -> Self {
        Self {
            total: stats.total,
            active: stats.active,
            inactive: stats.inactive,
            admins: stats.admins,
        }
    }
}
