//! Permission management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::dto::{ApiResponse, ValidatedJson};
use crate::api::handlers::error_response;
use crate::application::services::PermissionService;
use crate::domain::models::Permission;

/// Permission management state
#[derive(Clone)]
pub struct PermissionHandlerState {
    pub permissions: Arc<PermissionService>,
}

/// Разрешение
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "e7f2a9bb-4c1d-4a8e-9f3b-a2b3c4d5e6f7",
    "name": "USER_VIEW",
    "description": "View user information",
    "category": "USER_MANAGEMENT",
    "created_at": "2024-01-15T10:30:00Z",
    "updated_at": "2024-01-15T10:30:00Z"
}))]
pub struct PermissionDto {
    pub id: String,
    /// Имя разрешения (UPPER_SNAKE, уникальное)
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Категория для группировки (`USER_MANAGEMENT`, ...)
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionDto {
    pub fn from_domain(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            description: permission.description,
            category: permission.category,
            created_at: permission.created_at,
            updated_at: permission.updated_at,
        }
    }
}

/// Параметры фильтрации списка разрешений
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPermissionsParams {
    /// Фильтр по категории
    pub category: Option<String>,
}

/// Запрос на создание разрешения
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "REPORT_EXPORT",
    "description": "Export reports",
    "category": "REPORTING"
}))]
pub struct CreatePermissionRequest {
    /// Имя разрешения (2-64 символа, A-Z и подчёркивания)
    #[validate(length(min = 2, max = 64, message = "Name must be 2-64 characters"))]
    pub name: String,
    pub description: Option<String>,
    /// Категория (2-64 символа, A-Z и подчёркивания)
    #[validate(length(min = 2, max = 64, message = "Category must be 2-64 characters"))]
    pub category: String,
}

/// Запрос на обновление разрешения
///
/// Имя разрешения неизменяемо, обновляются описание и категория.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePermissionRequest {
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Список разрешений
///
/// Возвращает все разрешения, опционально в одной категории.
#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    params(ListPermissionsParams),
    responses(
        (status = 200, description = "Список разрешений", body = ApiResponse<Vec<PermissionDto>>),
        (status = 401, description = "Не авторизован"),
        (status = 403, description = "Недостаточно прав")
    )
)]
pub async fn list_permissions(
    State(state): State<PermissionHandlerState>,
    Query(params): Query<ListPermissionsParams>,
) -> Result<Json<ApiResponse<Vec<PermissionDto>>>, (StatusCode, Json<ApiResponse<Vec<PermissionDto>>>)>
{
    let permissions = state
        .permissions
        .list_permissions(params.category.as_deref())
        .await
        .map_err(error_response)?
        .into_iter()
        .map(PermissionDto::from_domain)
        .collect();

    Ok(Json(ApiResponse::success(permissions)))
}

/// Список категорий разрешений
#[utoipa::path(
    get,
    path = "/api/v1/permissions/categories",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Имена категорий по алфавиту", body = ApiResponse<Vec<String>>),
        (status = 401, description = "Не авторизован")
    )
)]
pub async fn list_permission_categories(
    State(state): State<PermissionHandlerState>,
) -> Result<Json<ApiResponse<Vec<String>>>, (StatusCode, Json<ApiResponse<Vec<String>>>)> {
    let categories = state
        .permissions
        .categories()
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(categories)))
}

/// Получение разрешения по ID
#[utoipa::path(
    get,
    path = "/api/v1/permissions/{id}",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор разрешения (UUID)")
    ),
    responses(
        (status = 200, description = "Разрешение", body = ApiResponse<PermissionDto>),
        (status = 404, description = "Разрешение не найдено")
    )
)]
pub async fn get_permission(
    State(state): State<PermissionHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PermissionDto>>, (StatusCode, Json<ApiResponse<PermissionDto>>)> {
    let permission = state
        .permissions
        .get_permission(&id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(PermissionDto::from_domain(
        permission,
    ))))
}

/// Создание разрешения
#[utoipa::path(
    post,
    path = "/api/v1/permissions",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    request_body = CreatePermissionRequest,
    responses(
        (status = 201, description = "Разрешение создано", body = ApiResponse<PermissionDto>),
        (status = 400, description = "Невалидное имя или категория"),
        (status = 409, description = "Разрешение с таким именем уже существует")
    )
)]
pub async fn create_permission(
    State(state): State<PermissionHandlerState>,
    ValidatedJson(request): ValidatedJson<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PermissionDto>>), (StatusCode, Json<ApiResponse<PermissionDto>>)>
{
    let permission = state
        .permissions
        .create_permission(
            &request.name,
            request.description.as_deref(),
            &request.category,
        )
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PermissionDto::from_domain(
            permission,
        ))),
    ))
}

/// Обновление разрешения
#[utoipa::path(
    put,
    path = "/api/v1/permissions/{id}",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор разрешения (UUID)")
    ),
    request_body = UpdatePermissionRequest,
    responses(
        (status = 200, description = "Разрешение обновлено", body = ApiResponse<PermissionDto>),
        (status = 400, description = "Невалидная категория"),
        (status = 404, description = "Разрешение не найдено")
    )
)]
pub async fn update_permission(
    State(state): State<PermissionHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdatePermissionRequest>,
) -> Result<Json<ApiResponse<PermissionDto>>, (StatusCode, Json<ApiResponse<PermissionDto>>)> {
    let permission = state
        .permissions
        .update_permission(&id, request.description.as_deref(), request.category.as_deref())
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(PermissionDto::from_domain(
        permission,
    ))))
}

/// Удаление разрешения
///
/// Разрешение, на которое ссылаются роли или прямые выдачи,
/// не удаляется.
#[utoipa::path(
    delete,
    path = "/api/v1/permissions/{id}",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор разрешения (UUID)")
    ),
    responses(
        (status = 200, description = "Разрешение удалено"),
        (status = 404, description = "Разрешение не найдено"),
        (status = 409, description = "Разрешение используется ролями или пользователями")
    )
)]
pub async fn delete_permission(
    State(state): State<PermissionHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .permissions
        .delete_permission(&id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(())))
}
