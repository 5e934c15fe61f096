//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

/// Health check state
#[derive(Clone)]
pub struct HealthHandlerState {
    pub db: sea_orm::DatabaseConnection,
}

/// Состояние сервиса
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Статус: `ok` — сервис работает нормально, `degraded` — база недоступна
    pub status: String,
    /// Имя сервиса (из Cargo.toml)
    pub service: String,
    /// Версия (из Cargo.toml)
    pub version: String,
    /// Состояние подключения к базе: `up` или `down`
    pub database: String,
}

/// Проверка состояния сервиса
///
/// Возвращает статус, версию и доступность базы данных.
/// Не требует авторизации. Используйте для мониторинга доступности.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Состояние сервиса и базы данных", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<HealthHandlerState>) -> Json<HealthResponse> {
    let database_up = state.db.ping().await.is_ok();

    Json(HealthResponse {
        status: if database_up { "ok" } else { "degraded" }.to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_up { "up" } else { "down" }.to_string(),
    })
}
