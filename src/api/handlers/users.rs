//! User management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::dto::{
    ApiResponse, AssignRolesRequest, ChangePasswordRequest, CreateUserRequest, PaginatedResponse,
    UpdateUserRequest, UserDto, ValidatedJson,
};
use crate::api::handlers::permissions::PermissionDto;
use crate::api::handlers::{error_response, require_admin_or, require_self_or_admin};
use crate::application::services::{AuthorizationService, UserService};
use crate::auth::middleware::AuthenticatedUser;
use crate::domain::models::UserFilter;
use crate::shared::types::PageRequest;
use crate::shared::validations::validate_pagination;

/// User management state
#[derive(Clone)]
pub struct UserHandlerState {
    pub users: Arc<UserService>,
    pub authz: Arc<AuthorizationService>,
}

/// Параметры фильтрации списка пользователей
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// Подстрока для поиска по имени пользователя или email
    pub search: Option<String>,
    /// Фильтр по основной роли (`ADMIN`, `USER`, ...)
    pub role: Option<String>,
    /// Фильтр по статусу учётной записи
    pub enabled: Option<bool>,
    /// Сортировка: `username`, `email`, `created_at`, `last_login_at`
    pub sort_by: Option<String>,
    /// Номер страницы (1-based). По умолчанию 1
    pub page: Option<u64>,
    /// Количество элементов на страницу (1-100). По умолчанию 20
    pub limit: Option<u64>,
}

/// Список пользователей
///
/// Возвращает страницу пользователей с фильтрацией и сортировкой.
/// Требуется роль `ADMIN` или разрешение `USER_VIEW`.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "Список пользователей с пагинацией", body = ApiResponse<PaginatedResponse<UserDto>>),
        (status = 401, description = "Не авторизован"),
        (status = 403, description = "Недостаточно прав")
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<UserDto>>>, (StatusCode, Json<ApiResponse<PaginatedResponse<UserDto>>>)>
{
    require_admin_or(&state.authz, &auth, "USER_VIEW").await?;

    let (page, limit) = validate_pagination(params.page, params.limit);
    let filter = UserFilter {
        search: params.search,
        role: params.role,
        enabled: params.enabled,
        sort_by: params.sort_by,
    };

    let result = state
        .users
        .list_users(filter, PageRequest::new(page, limit))
        .await
        .map_err(error_response)?;

    let page = PaginatedResponse::from(result.map(UserDto::from_user));
    Ok(Json(ApiResponse::success(page)))
}

/// Получение пользователя по ID
///
/// Пользователь может смотреть собственный профиль,
/// чужие профили доступны администраторам.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор пользователя (UUID)")
    ),
    responses(
        (status = 200, description = "Профиль пользователя с ролями", body = ApiResponse<UserDto>),
        (status = 403, description = "Чужой профиль без прав администратора"),
        (status = 404, description = "Пользователь не найден")
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    require_self_or_admin(&state.authz, &auth, &id).await?;

    let user = state.users.get_user(&id).await.map_err(error_response)?;
    let roles = state
        .users
        .roles_of(&id)
        .await
        .map_err(error_response)?
        .into_iter()
        .map(|r| r.name)
        .collect();

    Ok(Json(ApiResponse::success(UserDto::with_roles(user, roles))))
}

/// Создание пользователя
///
/// Административный аналог регистрации: позволяет задать роль
/// и сразу деактивировать учётную запись.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Пользователь создан", body = ApiResponse<UserDto>),
        (status = 403, description = "Недостаточно прав"),
        (status = 409, description = "Логин или email уже заняты"),
        (status = 422, description = "Ошибка валидации")
    )
)]
pub async fn create_user(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), (StatusCode, Json<ApiResponse<UserDto>>)> {
    require_admin_or(&state.authz, &auth, "USER_CREATE").await?;

    let role = request.role.as_deref().unwrap_or("USER");
    let user = state
        .users
        .create_user(
            &request.username,
            &request.email,
            &request.password,
            role,
            request.enabled.unwrap_or(true),
        )
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from_user(user))),
    ))
}

/// Обновление пользователя
///
/// Обновляет только переданные поля. Передача `role_ids`
/// полностью замещает текущие назначения ролей.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор пользователя (UUID)")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Пользователь обновлён", body = ApiResponse<UserDto>),
        (status = 403, description = "Недостаточно прав"),
        (status = 404, description = "Пользователь не найден"),
        (status = 409, description = "Email уже занят")
    )
)]
pub async fn update_user(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    require_admin_or(&state.authz, &auth, "USER_UPDATE").await?;

    let user = state
        .users
        .update_user(&id, request.email, request.enabled, request.role_ids)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(UserDto::from_user(user))))
}

/// Удаление пользователя
///
/// Удаление собственной учётной записи отклоняется с 409.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор пользователя (UUID)")
    ),
    responses(
        (status = 200, description = "Пользователь удалён"),
        (status = 403, description = "Недостаточно прав"),
        (status = 404, description = "Пользователь не найден"),
        (status = 409, description = "Попытка удалить собственную учётную запись")
    )
)]
pub async fn delete_user(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    require_admin_or(&state.authz, &auth, "USER_DELETE").await?;

    state
        .users
        .delete_user(&id, Some(&auth.user_id))
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(())))
}

/// Смена пароля пользователя
///
/// Владелец меняет свой пароль с подтверждением текущего.
/// Администратор может задать новый пароль без текущего.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/password",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор пользователя (UUID)")
    ),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Пароль изменён"),
        (status = 400, description = "Текущий пароль не указан"),
        (status = 401, description = "Неверный текущий пароль"),
        (status = 403, description = "Чужая учётная запись без прав администратора")
    )
)]
pub async fn change_user_password(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    require_self_or_admin(&state.authz, &auth, &id).await?;

    // Admins may reset someone else's password blind; the owner must
    // always confirm the current one.
    let changing_own = auth.user_id == id;
    let current = if changing_own {
        match request.current_password.as_deref() {
            Some(current) => Some(current),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error("Current password is required")),
                ))
            }
        }
    } else {
        request.current_password.as_deref()
    };

    state
        .users
        .change_password(&id, current, &request.new_password)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(())))
}

/// Замена ролей пользователя
///
/// Полностью замещает набор назначенных ролей и обновляет
/// отражённую основную роль.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/roles",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор пользователя (UUID)")
    ),
    request_body = AssignRolesRequest,
    responses(
        (status = 200, description = "Роли обновлены", body = ApiResponse<UserDto>),
        (status = 403, description = "Недостаточно прав"),
        (status = 404, description = "Пользователь или роль не найдены")
    )
)]
pub async fn set_user_roles(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<AssignRolesRequest>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    require_admin_or(&state.authz, &auth, "USER_PERMISSION_MANAGEMENT").await?;

    let user = state
        .users
        .update_user(&id, None, None, Some(request.role_ids))
        .await
        .map_err(error_response)?;

    let roles = state
        .users
        .roles_of(&id)
        .await
        .map_err(error_response)?
        .into_iter()
        .map(|r| r.name)
        .collect();

    Ok(Json(ApiResponse::success(UserDto::with_roles(user, roles))))
}

/// Эффективные разрешения пользователя
///
/// Объединение разрешений, унаследованных через роли,
/// и выданных напрямую.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/permissions",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор пользователя (UUID)")
    ),
    responses(
        (status = 200, description = "Список эффективных разрешений", body = ApiResponse<Vec<PermissionDto>>),
        (status = 403, description = "Недостаточно прав"),
        (status = 404, description = "Пользователь не найден")
    )
)]
pub async fn list_user_permissions(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PermissionDto>>>, (StatusCode, Json<ApiResponse<Vec<PermissionDto>>>)>
{
    require_admin_or(&state.authz, &auth, "USER_VIEW").await?;

    // 404 for unknown users instead of an empty permission list
    state.users.get_user(&id).await.map_err(error_response)?;

    let permissions = state
        .users
        .effective_permissions(&id)
        .await
        .map_err(error_response)?
        .into_iter()
        .map(PermissionDto::from_domain)
        .collect();

    Ok(Json(ApiResponse::success(permissions)))
}

/// Выдача прямого разрешения
///
/// Разрешение действует независимо от ролей пользователя.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/permissions/{name}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор пользователя (UUID)"),
        ("name" = String, Path, description = "Имя разрешения (`USER_VIEW`, ...)")
    ),
    responses(
        (status = 200, description = "Разрешение выдано"),
        (status = 403, description = "Недостаточно прав"),
        (status = 404, description = "Пользователь или разрешение не найдены")
    )
)]
pub async fn grant_user_permission(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    require_admin_or(&state.authz, &auth, "USER_PERMISSION_MANAGEMENT").await?;

    state
        .users
        .grant_permission(&id, &name)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(())))
}

/// Отзыв прямого разрешения
///
/// Затрагивает только прямые выдачи, разрешения из ролей остаются.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}/permissions/{name}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор пользователя (UUID)"),
        ("name" = String, Path, description = "Имя разрешения (`USER_VIEW`, ...)")
    ),
    responses(
        (status = 200, description = "Разрешение отозвано"),
        (status = 403, description = "Недостаточно прав"),
        (status = 404, description = "Пользователь или разрешение не найдены")
    )
)]
pub async fn revoke_user_permission(
    State(state): State<UserHandlerState>,
    axum::Extension(auth): axum::Extension<AuthenticatedUser>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    require_admin_or(&state.authz, &auth, "USER_PERMISSION_MANAGEMENT").await?;

    state
        .users
        .revoke_permission(&id, &name)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(())))
}
