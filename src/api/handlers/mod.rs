//! API Handlers

use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use crate::api::dto::ApiResponse;
use crate::application::services::AuthorizationService;
use crate::auth::middleware::AuthenticatedUser;
use crate::shared::types::DomainError;

pub mod admin;
pub mod auth;
pub mod health;
pub mod permissions;
pub mod roles;
pub mod users;

pub use admin::*;
pub use auth::*;
pub use health::*;
pub use permissions::*;
pub use roles::*;
pub use users::*;

/// Maps a domain error onto the HTTP status + envelope every handler returns.
///
/// Transient database failures are logged and hidden behind a generic 500
/// so internals never leak into API responses.
pub(crate) fn error_response<T>(err: DomainError) -> (StatusCode, Json<ApiResponse<T>>) {
    if err.is_transient() {
        error!("request failed on a database error: {}", err);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Internal server error")),
        );
    }

    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        // Disabled features pretend the route does not exist
        DomainError::FeatureDisabled(_) => StatusCode::NOT_FOUND,
        DomainError::Mail(_) => StatusCode::BAD_GATEWAY,
        DomainError::TokenExpired | DomainError::TokenUsed => StatusCode::BAD_REQUEST,
    };

    (status, Json(ApiResponse::error(clean_message(&err))))
}

/// Rejects requests to endpoints switched off in `features` config.
pub(crate) fn feature_gate<T>(
    enabled: bool,
    feature: &'static str,
) -> Result<(), (StatusCode, Json<ApiResponse<T>>)> {
    if enabled {
        Ok(())
    } else {
        Err(error_response(DomainError::FeatureDisabled(feature)))
    }
}

/// Passes administrators, or anyone holding the named permission
/// directly or through a role.
pub(crate) async fn require_admin_or<T>(
    authz: &AuthorizationService,
    user: &AuthenticatedUser,
    permission: &str,
) -> Result<(), (StatusCode, Json<ApiResponse<T>>)> {
    let allowed = authz
        .has_role(&user.user_id, "ADMIN")
        .await
        .map_err(error_response)?
        || authz
            .has_permission(&user.user_id, permission)
            .await
            .map_err(error_response)?;

    if allowed {
        Ok(())
    } else {
        Err(error_response(DomainError::Forbidden(
            "Insufficient permissions".to_string(),
        )))
    }
}

/// Passes the owner of the target account, or an administrator.
pub(crate) async fn require_self_or_admin<T>(
    authz: &AuthorizationService,
    user: &AuthenticatedUser,
    owner_id: &str,
) -> Result<(), (StatusCode, Json<ApiResponse<T>>)> {
    let allowed = authz
        .is_owner_or_admin(&user.user_id, owner_id)
        .await
        .map_err(error_response)?;

    if allowed {
        Ok(())
    } else {
        Err(error_response(DomainError::Forbidden(
            "Insufficient permissions".to_string(),
        )))
    }
}

/// User-facing message without the enum prefix
fn clean_message(err: &DomainError) -> String {
    match err {
        DomainError::Validation(msg)
        | DomainError::Conflict(msg)
        | DomainError::Unauthorized(msg)
        | DomainError::Forbidden(msg)
        | DomainError::Mail(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        let cases = [
            (
                DomainError::NotFound {
                    entity: "User",
                    field: "id",
                    value: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::Validation("bad input".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::Conflict("username".into()),
                StatusCode::CONFLICT,
            ),
            (
                DomainError::Unauthorized("Invalid credentials".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                DomainError::Forbidden("admin only".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                DomainError::FeatureDisabled("Registration"),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::Mail("relay refused".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (DomainError::TokenExpired, StatusCode::BAD_REQUEST),
            (DomainError::TokenUsed, StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            let (status, _) = error_response::<()>(err);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_transient_db_error_becomes_500() {
        let err = DomainError::Validation("Database error: connection reset".into());
        let (status, Json(body)) = error_response::<()>(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        // the driver message must not leak
        assert_eq!(body.error.as_deref(), Some("Internal server error"));
    }

    #[test]
    fn test_message_prefix_stripped() {
        let err = DomainError::Unauthorized("Invalid credentials".into());
        let (_, Json(body)) = error_response::<()>(err);
        assert_eq!(body.error.as_deref(), Some("Invalid credentials"));

        let err = DomainError::TokenExpired;
        let (_, Json(body)) = error_response::<()>(err);
        assert_eq!(body.error.as_deref(), Some("Reset token has expired"));
    }
}
