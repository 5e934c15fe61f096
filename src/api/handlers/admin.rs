//! Admin dashboard handlers
//!
//! All routes are mounted behind the admin middleware and the
//! `features.admin_panel_enabled` toggle.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::dto::{ApiResponse, UserStatsDto};
use crate::api::handlers::error_response;
use crate::application::services::UserService;
use crate::observability::{LogBuffer, LogEvent};

/// Admin dashboard state
#[derive(Clone)]
pub struct AdminHandlerState {
    pub users: Arc<UserService>,
    pub log_buffer: LogBuffer,
}

/// Запись журнала приложения
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "timestamp": "2024-01-15T12:00:00Z",
    "level": "INFO",
    "target": "core_auth::application::services::user_service",
    "message": "User created: alice"
}))]
pub struct LogEventDto {
    pub timestamp: DateTime<Utc>,
    /// Уровень: `ERROR`, `WARN`, `INFO`, `DEBUG`, `TRACE`
    pub level: String,
    /// Модуль-источник записи
    pub target: String,
    pub message: String,
}

impl From<LogEvent> for LogEventDto {
    fn from(event: LogEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            level: event.level,
            target: event.target,
            message: event.message,
        }
    }
}

/// Статистика журнала
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "buffered": 412,
    "capacity": 1000,
    "active_streams": 1,
    "by_level": {"ERROR": 2, "WARN": 10, "INFO": 400, "DEBUG": 0, "TRACE": 0}
}))]
pub struct LogStatsDto {
    /// Записей в буфере
    pub buffered: usize,
    /// Максимальный размер буфера
    pub capacity: usize,
    /// Открытых SSE-подписок
    pub active_streams: usize,
    /// Количество записей по уровням
    pub by_level: BTreeMap<String, usize>,
}

/// Параметры выборки журнала
#[derive(Debug, Deserialize, IntoParams)]
pub struct LogsParams {
    /// Фильтр по уровню. `ALL` или пусто — без фильтра
    pub level: Option<String>,
    /// Максимум записей. По умолчанию 100
    pub limit: Option<usize>,
}

/// Сводная статистика пользователей
///
/// Счётчики для карточек административной панели.
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Счётчики пользователей", body = ApiResponse<UserStatsDto>),
        (status = 401, description = "Не авторизован"),
        (status = 403, description = "Требуются права администратора")
    )
)]
pub async fn admin_stats(
    State(state): State<AdminHandlerState>,
) -> Result<Json<ApiResponse<UserStatsDto>>, (StatusCode, Json<ApiResponse<UserStatsDto>>)> {
    let stats = state.users.stats().await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(UserStatsDto::from(stats))))
}

/// Последние записи журнала
///
/// Возвращает записи в хронологическом порядке (старые первыми).
#[utoipa::path(
    get,
    path = "/api/v1/admin/logs",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(LogsParams),
    responses(
        (status = 200, description = "Записи журнала", body = ApiResponse<Vec<LogEventDto>>),
        (status = 403, description = "Требуются права администратора")
    )
)]
pub async fn recent_logs(
    State(state): State<AdminHandlerState>,
    Query(params): Query<LogsParams>,
) -> Json<ApiResponse<Vec<LogEventDto>>> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    // "ALL" comes from the dashboard level selector
    let level = params
        .level
        .as_deref()
        .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("all"));

    let events = state
        .log_buffer
        .recent(limit, level)
        .into_iter()
        .map(LogEventDto::from)
        .collect();

    Json(ApiResponse::success(events))
}

/// Живой поток журнала (SSE)
///
/// Первым приходит событие `connected`, затем событие `log`
/// на каждую новую запись. Keep-alive каждые 30 секунд.
#[utoipa::path(
    get,
    path = "/api/v1/admin/logs/stream",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Поток событий `text/event-stream`"),
        (status = 403, description = "Требуются права администратора")
    )
)]
pub async fn stream_logs(
    State(state): State<AdminHandlerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.log_buffer.subscribe();

    let connected = stream::once(async {
        Ok(Event::default().event("connected").data(
            serde_json::json!({
                "message": "SSE connection established",
                "timestamp": Utc::now(),
            })
            .to_string(),
        ))
    });

    let records = stream::unfold(subscription, |mut subscription| async move {
        let event = subscription.recv().await?;
        let payload = serde_json::to_string(&LogEventDto::from(event))
            .unwrap_or_else(|_| "{}".to_string());
        Some((Ok(Event::default().event("log").data(payload)), subscription))
    });

    Sse::new(connected.chain(records)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keepalive"),
    )
}

/// Статистика журнала
///
/// Объём буфера, количество подписчиков и разбивка по уровням.
#[utoipa::path(
    get,
    path = "/api/v1/admin/logs/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Статистика журнала", body = ApiResponse<LogStatsDto>),
        (status = 403, description = "Требуются права администратора")
    )
)]
pub async fn log_stats(State(state): State<AdminHandlerState>) -> Json<ApiResponse<LogStatsDto>> {
    let stats = state.log_buffer.stats();
    Json(ApiResponse::success(LogStatsDto {
        buffered: stats.buffered,
        capacity: stats.capacity,
        active_streams: stats.active_streams,
        by_level: stats.by_level,
    }))
}
