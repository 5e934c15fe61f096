//! Role management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::dto::{ApiResponse, ValidatedJson};
use crate::api::handlers::error_response;
use crate::application::services::RoleService;
use crate::domain::models::Role;

/// Role management state
#[derive(Clone)]
pub struct RoleHandlerState {
    pub roles: Arc<RoleService>,
}

/// Роль с набором разрешений
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "b3c1f7aa-2e9d-4f3b-8a1c-d4e5f6a7b8c9",
    "name": "MODERATOR",
    "description": "Content Moderator",
    "permissions": ["USER_UPDATE", "USER_VIEW"],
    "created_at": "2024-01-15T10:30:00Z",
    "updated_at": "2024-01-15T10:30:00Z"
}))]
pub struct RoleDto {
    pub id: String,
    /// Имя роли (UPPER_SNAKE, уникальное)
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Имена разрешений роли, отсортированы по алфавиту
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleDto {
    pub fn from_domain(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
            permissions: role.permissions,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

/// Запрос на создание роли
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "SUPPORT",
    "description": "Support engineer",
    "permissions": ["USER_VIEW"]
}))]
pub struct CreateRoleRequest {
    /// Имя роли (2-64 символа, A-Z и подчёркивания)
    #[validate(length(min = 2, max = 64, message = "Name must be 2-64 characters"))]
    pub name: String,
    pub description: Option<String>,
    /// Имена разрешений. По умолчанию пустой набор
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Запрос на обновление роли
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    pub description: Option<String>,
    /// Полный набор имён разрешений (замещает текущий)
    pub permissions: Option<Vec<String>>,
}

/// Запрос на замену разрешений роли
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "permissions": ["USER_VIEW", "USER_UPDATE"]
}))]
pub struct SetRolePermissionsRequest {
    pub permissions: Vec<String>,
}

/// Список ролей
#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "Roles",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Все роли с их разрешениями", body = ApiResponse<Vec<RoleDto>>),
        (status = 401, description = "Не авторизован"),
        (status = 403, description = "Недостаточно прав")
    )
)]
pub async fn list_roles(
    State(state): State<RoleHandlerState>,
) -> Result<Json<ApiResponse<Vec<RoleDto>>>, (StatusCode, Json<ApiResponse<Vec<RoleDto>>>)> {
    let roles = state
        .roles
        .list_roles()
        .await
        .map_err(error_response)?
        .into_iter()
        .map(RoleDto::from_domain)
        .collect();

    Ok(Json(ApiResponse::success(roles)))
}

/// Получение роли по ID
#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор роли (UUID)")
    ),
    responses(
        (status = 200, description = "Роль с разрешениями", body = ApiResponse<RoleDto>),
        (status = 404, description = "Роль не найдена")
    )
)]
pub async fn get_role(
    State(state): State<RoleHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RoleDto>>, (StatusCode, Json<ApiResponse<RoleDto>>)> {
    let role = state.roles.get_role(&id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(RoleDto::from_domain(role))))
}

/// Создание роли
///
/// Имя роли пишется в формате UPPER_SNAKE и должно быть уникальным.
/// Несуществующие имена разрешений отклоняются с 404.
#[utoipa::path(
    post,
    path = "/api/v1/roles",
    tag = "Roles",
    security(("bearer_auth" = [])),
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Роль создана", body = ApiResponse<RoleDto>),
        (status = 400, description = "Невалидное имя роли"),
        (status = 404, description = "Разрешение из списка не найдено"),
        (status = 409, description = "Роль с таким именем уже существует")
    )
)]
pub async fn create_role(
    State(state): State<RoleHandlerState>,
    ValidatedJson(request): ValidatedJson<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoleDto>>), (StatusCode, Json<ApiResponse<RoleDto>>)> {
    let role = state
        .roles
        .create_role(
            &request.name,
            request.description.as_deref(),
            &request.permissions,
        )
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RoleDto::from_domain(role))),
    ))
}

/// Обновление роли
///
/// Имя роли неизменяемо. Передача `permissions` полностью
/// замещает текущий набор разрешений.
#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор роли (UUID)")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Роль обновлена", body = ApiResponse<RoleDto>),
        (status = 404, description = "Роль или разрешение не найдены")
    )
)]
pub async fn update_role(
    State(state): State<RoleHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<RoleDto>>, (StatusCode, Json<ApiResponse<RoleDto>>)> {
    let role = state
        .roles
        .update_role(
            &id,
            request.description.as_deref(),
            request.permissions.as_deref(),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(RoleDto::from_domain(role))))
}

/// Удаление роли
///
/// Роль, назначенная хотя бы одному пользователю, не удаляется.
#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор роли (UUID)")
    ),
    responses(
        (status = 200, description = "Роль удалена"),
        (status = 404, description = "Роль не найдена"),
        (status = 409, description = "Роль назначена пользователям")
    )
)]
pub async fn delete_role(
    State(state): State<RoleHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    state.roles.delete_role(&id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(())))
}

/// Замена разрешений роли
///
/// Затрагивает всех пользователей с этой ролью немедленно.
#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}/permissions",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор роли (UUID)")
    ),
    request_body = SetRolePermissionsRequest,
    responses(
        (status = 200, description = "Разрешения обновлены", body = ApiResponse<RoleDto>),
        (status = 404, description = "Роль или разрешение не найдены")
    )
)]
pub async fn set_role_permissions(
    State(state): State<RoleHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<SetRolePermissionsRequest>,
) -> Result<Json<ApiResponse<RoleDto>>, (StatusCode, Json<ApiResponse<RoleDto>>)> {
    let role = state
        .roles
        .update_role(&id, None, Some(&request.permissions))
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(RoleDto::from_domain(role))))
}
