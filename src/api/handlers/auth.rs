//! Authentication API handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::dto::{ApiResponse, ChangePasswordRequest, UserDto, ValidatedJson};
use crate::api::handlers::{error_response, feature_gate};
use crate::application::services::{PasswordResetService, UserService};
use crate::auth::middleware::AuthenticatedUser;
use crate::auth::{create_token, JwtConfig};
use crate::config::FeatureToggles;

/// Auth state for authentication handlers
#[derive(Clone)]
pub struct AuthHandlerState {
    pub users: Arc<UserService>,
    pub reset: Arc<PasswordResetService>,
    pub jwt_config: JwtConfig,
    pub features: FeatureToggles,
}

/// Запрос на авторизацию
#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "username": "admin",
    "password": "secret123"
}))]
pub struct LoginRequest {
    /// Имя пользователя или email
    pub username: String,
    /// Пароль
    pub password: String,
}

/// Ответ на успешную авторизацию
///
/// Содержит JWT-токен для последующих запросов.
/// Токен передаётся в заголовке `Authorization: Bearer <token>`
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
    "token_type": "Bearer",
    "expires_in": 86400,
    "user": {
        "id": "0d9e7a65-7c2b-4c57-9d8f-1f6f2a3b4c5d",
        "username": "admin",
        "email": "admin@example.com",
        "role": "ADMIN",
        "enabled": true
    }
}))]
pub struct LoginResponse {
    /// JWT access-токен для авторизации. Передавайте в заголовке `Authorization: Bearer <token>`
    pub token: String,
    /// Тип токена (всегда `Bearer`)
    pub token_type: String,
    /// Время жизни токена в секундах (по умолчанию 86400 = 24 часа)
    pub expires_in: i64,
    /// Информация о пользователе
    pub user: UserDto,
}

/// Запрос на регистрацию нового пользователя
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "username": "newuser",
    "email": "user@example.com",
    "password": "secure_password_123"
}))]
pub struct RegisterRequest {
    /// Имя пользователя (от 3 до 50 символов, уникальное)
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    /// Email-адрес (уникальный)
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Пароль (8-128 символов)
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
}

/// Запрос на восстановление пароля
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "email": "user@example.com" }))]
pub struct ForgotPasswordRequest {
    /// Email учётной записи
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Параметры проверки токена сброса пароля
#[derive(Debug, Deserialize, IntoParams)]
pub struct ValidateTokenParams {
    /// Токен из письма восстановления
    pub token: String,
}

/// Результат проверки токена сброса пароля
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({ "valid": true }))]
pub struct TokenValidity {
    pub valid: bool,
}

/// Запрос на установку нового пароля по токену
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "token": "3f8a2c44-9d1e-4b7a-8c2d-5e6f7a8b9c0d",
    "new_password": "brand-new-password"
}))]
pub struct ResetPasswordRequest {
    /// Токен из письма восстановления
    pub token: String,
    /// Новый пароль (8-128 символов)
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub new_password: String,
}

/// Авторизация пользователя
///
/// Возвращает JWT-токен при успешной аутентификации.
/// Можно использовать как имя пользователя, так и email в поле `username`.
/// Если аккаунт деактивирован — вернёт 401.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Успешная авторизация, возвращает JWT-токен", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Неверные учётные данные или аккаунт деактивирован")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, (StatusCode, Json<ApiResponse<LoginResponse>>)> {
    let user = state
        .users
        .authenticate(&request.username, &request.password)
        .await
        .map_err(error_response)?;

    let token = create_token(&user.id, &user.username, &user.role, &state.jwt_config).map_err(
        |e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        },
    )?;

    let response = LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_config.expiration_hours * 3600,
        user: UserDto::from_user(user),
    };

    Ok(Json(ApiResponse::success(response)))
}

/// Регистрация нового пользователя
///
/// Создаёт нового пользователя с ролью `USER` (по умолчанию).
/// Логин и email должны быть уникальными.
/// Доступно только при включённой настройке `features.registration_enabled`.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Пользователь успешно создан", body = ApiResponse<UserDto>),
        (status = 404, description = "Регистрация отключена"),
        (status = 409, description = "Пользователь с таким логином или email уже существует"),
        (status = 422, description = "Ошибка валидации (короткий пароль, невалидный email и т.д.)")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), (StatusCode, Json<ApiResponse<UserDto>>)> {
    feature_gate(state.features.registration_enabled, "Registration")?;

    let user = state
        .users
        .register(&request.username, &request.email, &request.password)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from_user(user))),
    ))
}

/// Получение информации о текущем пользователе
///
/// Возвращает данные пользователя, авторизованного по JWT-токену,
/// вместе со списком назначенных ролей.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Информация о текущем пользователе", body = ApiResponse<UserDto>),
        (status = 401, description = "Не авторизован (невалидный или отсутствующий токен)")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthHandlerState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    let db_user = state
        .users
        .get_user(&user.user_id)
        .await
        .map_err(error_response)?;

    let roles = state
        .users
        .roles_of(&user.user_id)
        .await
        .map_err(error_response)?
        .into_iter()
        .map(|r| r.name)
        .collect();

    Ok(Json(ApiResponse::success(UserDto::with_roles(
        db_user, roles,
    ))))
}

/// Смена пароля текущего пользователя
///
/// Для подтверждения операции требуется указать текущий пароль.
#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Authentication",
    security(
        ("bearer_auth" = [])
    ),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Пароль успешно изменён"),
        (status = 400, description = "Текущий пароль не указан"),
        (status = 401, description = "Неверный текущий пароль или не авторизован"),
        (status = 422, description = "Новый пароль не проходит валидацию")
    )
)]
pub async fn change_own_password(
    State(state): State<AuthHandlerState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    // Changing your own password always requires the current one
    let Some(current) = request.current_password.as_deref() else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Current password is required")),
        ));
    };

    state
        .users
        .change_password(&user.user_id, Some(current), &request.new_password)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(())))
}

/// Запрос на восстановление пароля
///
/// Отправляет письмо со ссылкой для сброса пароля.
/// Ответ всегда 200, существование email не раскрывается.
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "Authentication",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Если email зарегистрирован, письмо отправлено"),
        (status = 404, description = "Восстановление пароля отключено"),
        (status = 422, description = "Невалидный email")
    )
)]
pub async fn forgot_password(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    feature_gate(state.features.forgot_password_enabled, "Password recovery")?;

    // Mail transport failures are logged by the service. The response stays
    // 200 either way so the endpoint cannot be used to probe for accounts.
    match state.reset.request_reset(&request.email).await {
        Ok(()) => {}
        Err(e) if e.is_transient() => return Err(error_response(e)),
        Err(e) => {
            tracing::warn!("password reset request did not complete: {}", e);
        }
    }

    Ok(Json(ApiResponse::success(())))
}

/// Проверка токена сброса пароля
///
/// Используется формой сброса перед запросом нового пароля.
#[utoipa::path(
    get,
    path = "/api/v1/auth/reset-password/validate",
    tag = "Authentication",
    params(ValidateTokenParams),
    responses(
        (status = 200, description = "Результат проверки токена", body = ApiResponse<TokenValidity>),
        (status = 404, description = "Сброс пароля отключён")
    )
)]
pub async fn validate_reset_token(
    State(state): State<AuthHandlerState>,
    Query(params): Query<ValidateTokenParams>,
) -> Result<Json<ApiResponse<TokenValidity>>, (StatusCode, Json<ApiResponse<TokenValidity>>)> {
    feature_gate(state.features.password_reset_enabled, "Password reset")?;

    let valid = state
        .reset
        .validate_token(&params.token)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(TokenValidity { valid })))
}

/// Установка нового пароля по токену
///
/// Токен одноразовый и действует 24 часа с момента запроса.
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "Authentication",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Пароль успешно изменён"),
        (status = 400, description = "Токен невалиден, истёк или уже использован"),
        (status = 404, description = "Сброс пароля отключён"),
        (status = 422, description = "Новый пароль не проходит валидацию")
    )
)]
pub async fn reset_password(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    feature_gate(state.features.password_reset_enabled, "Password reset")?;

    state
        .reset
        .reset_password(&request.token, &request.new_password)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::in_memory_provider;
    use crate::mail::LogMailer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;

    fn test_state(features: FeatureToggles) -> AuthHandlerState {
        let repos = in_memory_provider();
        AuthHandlerState {
            users: Arc::new(UserService::new(repos.clone())),
            reset: Arc::new(PasswordResetService::new(
                repos,
                Arc::new(LogMailer),
                "http://localhost:8080",
            )),
            jwt_config: JwtConfig::default(),
            features,
        }
    }

    fn app(state: AuthHandlerState) -> Router {
        Router::new()
            .route("/login", post(login))
            .route("/register", post(register))
            .with_state(state)
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn send(state: AuthHandlerState, req: Request<Body>) -> axum::http::Response<Body> {
        use tower::Service;
        let mut svc = app(state).into_service();
        svc.call(req).await.unwrap()
    }

    #[tokio::test]
    async fn register_then_login_returns_token() {
        let state = test_state(FeatureToggles::default());

        let resp = send(
            state.clone(),
            json_post(
                "/register",
                serde_json::json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "password123"
                }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send(
            state,
            json_post(
                "/login",
                serde_json::json!({"username": "alice", "password": "password123"}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["token_type"], "Bearer");
        assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
        // the password hash must never appear in a response
        assert!(body["data"]["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let state = test_state(FeatureToggles::default());

        send(
            state.clone(),
            json_post(
                "/register",
                serde_json::json!({
                    "username": "bob",
                    "email": "bob@example.com",
                    "password": "password123"
                }),
            ),
        )
        .await;

        let resp = send(
            state,
            json_post(
                "/login",
                serde_json::json!({"username": "bob", "password": "wrong-password"}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_is_gated_by_feature_toggle() {
        let features = FeatureToggles {
            registration_enabled: false,
            ..FeatureToggles::default()
        };
        let resp = send(
            test_state(features),
            json_post(
                "/register",
                serde_json::json!({
                    "username": "carol",
                    "email": "carol@example.com",
                    "password": "password123"
                }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let state = test_state(FeatureToggles::default());
        let body = serde_json::json!({
            "username": "dave",
            "email": "dave@example.com",
            "password": "password123"
        });

        let resp = send(state.clone(), json_post("/register", body.clone())).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send(state, json_post("/register", body)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
