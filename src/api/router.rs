//! API Router with Swagger UI

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::dto::*;
use crate::api::handlers::{admin, auth, health, permissions, roles, users};
use crate::application::services::{
    AuthorizationService, PasswordResetService, PermissionService, RoleService, UserService,
};
use crate::auth::middleware::{admin_middleware, auth_middleware, AuthState};
use crate::auth::JwtConfig;
use crate::config::AuthConfig;
use crate::domain::repositories::RepositoryProvider;
use crate::mail::Mailer;
use crate::observability::LogBuffer;

/// Everything the router needs from the host application.
#[derive(Clone)]
pub struct ApiContext {
    pub db: DatabaseConnection,
    pub repos: Arc<dyn RepositoryProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub log_buffer: LogBuffer,
    /// Render handle of the installed Prometheus recorder
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        auth::register,
        auth::get_current_user,
        auth::change_own_password,
        auth::forgot_password,
        auth::validate_reset_token,
        auth::reset_password,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::change_user_password,
        users::set_user_roles,
        users::list_user_permissions,
        users::grant_user_permission,
        users::revoke_user_permission,
        // Roles
        roles::list_roles,
        roles::get_role,
        roles::create_role,
        roles::update_role,
        roles::delete_role,
        roles::set_role_permissions,
        // Permissions
        permissions::list_permissions,
        permissions::list_permission_categories,
        permissions::get_permission,
        permissions::create_permission,
        permissions::update_permission,
        permissions::delete_permission,
        // Admin
        admin::admin_stats,
        admin::recent_logs,
        admin::stream_logs,
        admin::log_stats,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            PaginationParams,
            PaginatedResponse<UserDto>,
            EmptyData,
            // Users
            UserDto,
            CreateUserRequest,
            UpdateUserRequest,
            ChangePasswordRequest,
            AssignRolesRequest,
            UserStatsDto,
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::ForgotPasswordRequest,
            auth::TokenValidity,
            auth::ResetPasswordRequest,
            // Roles
            roles::RoleDto,
            roles::CreateRoleRequest,
            roles::UpdateRoleRequest,
            roles::SetRolePermissionsRequest,
            // Permissions
            permissions::PermissionDto,
            permissions::CreatePermissionRequest,
            permissions::UpdatePermissionRequest,
            // Admin
            admin::LogEventDto,
            admin::LogStatsDto,
            // Health
            health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Проверка состояния сервиса и базы данных. Используйте для health-check мониторинга (uptime, ping, readiness)."),
        (name = "Authentication", description = "Аутентификация пользователей: вход (JWT), регистрация, смена и восстановление пароля. Токен возвращается в поле `token` и передаётся в заголовке `Authorization: Bearer <token>`."),
        (name = "Users", description = "Управление пользователями: CRUD, назначение ролей, прямые разрешения. Большинство операций требует роль `ADMIN` или соответствующее разрешение `USER_*`. Пользователь всегда может смотреть свой профиль и менять свой пароль."),
        (name = "Roles", description = "Управление ролями и их разрешениями. Роль объединяет набор разрешений; назначенная пользователям роль не удаляется. Встроенные роли: `ADMIN`, `USER`, `MODERATOR`."),
        (name = "Permissions", description = "Каталог разрешений, сгруппированных по категориям (`USER_MANAGEMENT`, `ROLE_MANAGEMENT`, `SYSTEM_MONITORING`, ...). Разрешение, на которое ссылаются роли или пользователи, не удаляется."),
        (name = "Admin", description = "Административная панель: статистика пользователей и журнал приложения (последние записи, live-поток через SSE, разбивка по уровням). Требуются права администратора, раздел включается настройкой `features.admin_panel_enabled`."),
    ),
    info(
        title = "Core Auth API",
        version = "1.0.28",
        description = "REST API для аутентификации и управления пользователями.

## Возможности

- **Аутентификация** — JWT-токены, bcrypt-хэширование паролей
- **Пользователи** — CRUD, активация/деактивация, статистика
- **Роли и разрешения** — гибкая модель доступа: роли наследуют разрешения, разрешения выдаются и напрямую
- **Восстановление пароля** — одноразовые токены со сроком действия 24 часа, уведомления по email
- **Административная панель** — счётчики пользователей и живой журнал приложения

## Аутентификация

Получите токен через `POST /api/v1/auth/login` и передавайте его в заголовке `Authorization: Bearer <token>`.

## Формат ответов

Все REST-ответы обёрнуты в стандартную оболочку:
```json
{\"success\": true, \"data\": {...}, \"error\": null}
```

При ошибке:
```json
{\"success\": false, \"data\": null, \"error\": \"описание ошибки\"}
```

## Пагинация

Эндпоинты со списками поддерживают параметры `page` (от 1) и `limit` (1-100, по умолчанию 20).",
        license(
            name = "MIT"
        ),
        contact(
            name = "Control",
            email = "support@control.com"
        )
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(context: ApiContext, config: &AuthConfig) -> Router {
    let jwt_config = JwtConfig::from(&config.security);
    let repos = context.repos.clone();

    let middleware_state = AuthState::new(jwt_config.clone(), repos.clone());

    // ── Shared services ─────────────────────────────────────────────
    let user_service = Arc::new(UserService::new(repos.clone()));
    let role_service = Arc::new(RoleService::new(repos.clone()));
    let permission_service = Arc::new(PermissionService::new(repos.clone()));
    let authz_service = Arc::new(AuthorizationService::new(repos.clone()));
    let reset_service = Arc::new(PasswordResetService::new(
        repos,
        context.mailer.clone(),
        &config.app.base_url,
    ));

    let auth_state = auth::AuthHandlerState {
        users: user_service.clone(),
        reset: reset_service,
        jwt_config: jwt_config.clone(),
        features: config.features.clone(),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Auth routes (public). The whole group shares one peer-IP rate
    // limit, so password guessing and reset-token farming hit the same
    // budget. Requires `into_make_service_with_connect_info::<SocketAddr>()`
    // on the server for the peer IP to be visible.
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/validate", get(auth::validate_reset_token))
        .route("/reset-password", post(auth::reset_password))
        .with_state(auth_state.clone());

    let governor_config = GovernorConfigBuilder::default()
        .per_second(config.rate_limit.login_per_second.max(1))
        .burst_size(config.rate_limit.login_burst.max(1))
        .finish();
    let auth_routes = match governor_config {
        Some(governor_config) => auth_routes.layer(GovernorLayer::new(Arc::new(governor_config))),
        None => {
            warn!("Invalid rate limit config, login throttling disabled");
            auth_routes
        }
    };

    // Auth routes (protected)
    let auth_protected_routes = Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/change-password", post(auth::change_own_password))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    // User routes (protected; per-handler permission checks)
    let user_state = users::UserHandlerState {
        users: user_service.clone(),
        authz: authz_service,
    };
    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/{id}/password", put(users::change_user_password))
        .route("/{id}/roles", put(users::set_user_roles))
        .route("/{id}/permissions", get(users::list_user_permissions))
        .route(
            "/{id}/permissions/{name}",
            post(users::grant_user_permission).delete(users::revoke_user_permission),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(user_state);

    // Role routes (admin only)
    let role_routes = Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        .route("/{id}/permissions", put(roles::set_role_permissions))
        // Layers run bottom-up: auth_middleware goes last so it runs
        // first and populates the user for admin_middleware.
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            admin_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(roles::RoleHandlerState {
            roles: role_service,
        });

    // Permission routes (admin only)
    let permission_routes = Router::new()
        .route(
            "/",
            get(permissions::list_permissions).post(permissions::create_permission),
        )
        .route("/categories", get(permissions::list_permission_categories))
        .route(
            "/{id}",
            get(permissions::get_permission)
                .put(permissions::update_permission)
                .delete(permissions::delete_permission),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            admin_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(permissions::PermissionHandlerState {
            permissions: permission_service,
        });

    // Admin dashboard routes (admin only, behind the feature toggle)
    let admin_routes = Router::new()
        .route("/stats", get(admin::admin_stats))
        .route("/logs", get(admin::recent_logs))
        .route("/logs/stream", get(admin::stream_logs))
        .route("/logs/stats", get(admin::log_stats))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            admin_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(admin::AdminHandlerState {
            users: user_service,
            log_buffer: context.log_buffer,
        });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthHandlerState {
            db: context.db.clone(),
        });

    let swagger_routes =
        SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    let mut router = Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health
        .nest("/api/v1", health_routes)
        // Auth
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/auth", auth_protected_routes)
        // Users
        .nest("/api/v1/users", user_routes)
        // Roles
        .nest("/api/v1/roles", role_routes)
        // Permissions
        .nest("/api/v1/permissions", permission_routes);

    // A disabled admin panel is not mounted at all, the routes 404
    if config.features.admin_panel_enabled {
        router = router.nest("/api/v1/admin", admin_routes);
    }

    #[cfg(feature = "metrics")]
    {
        use crate::observability::{http_metrics_middleware, prometheus_metrics, MetricsState};

        if let Some(handle) = context.metrics_handle {
            let metrics_routes = Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle });
            router = router
                .merge(metrics_routes)
                .layer(middleware::from_fn(http_metrics_middleware));
        }
    }

    // Middleware
    router.layer(cors).layer(TraceLayer::new_for_http())
}
