//! Authentication middleware for Axum

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use super::jwt::{verify_token, AuthError, JwtConfig};
use crate::application::AuthorizationService;
use crate::domain::{RepositoryProvider, User};

/// Authentication state containing the JWT config and the repositories
/// used for the per-request account re-check.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
    pub repos: Arc<dyn RepositoryProvider>,
}

impl AuthState {
    pub fn new(jwt_config: JwtConfig, repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { jwt_config, repos }
    }

    fn authorization(&self) -> AuthorizationService {
        AuthorizationService::new(self.repos.clone())
    }
}

/// Authenticated user information, inserted into request extensions by
/// [`auth_middleware`]. Role reflects the database, not the token, so
/// role changes apply without waiting for the token to expire.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == "ADMIN"
    }
}

/// Extract token from Authorization header
fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// JWT authentication middleware - requires a valid token and an account
/// that still exists and is enabled.
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let Some(auth_header) = auth_header else {
        return auth_error_response(AuthError::MissingToken);
    };

    let Some(token) = extract_token(&auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    let claims = match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) => claims,
        Err(_) => return auth_error_response(AuthError::InvalidToken),
    };
    if claims.is_expired() {
        return auth_error_response(AuthError::ExpiredToken);
    }

    // The token may outlive the account. Deleted accounts lose access
    // immediately, disabled accounts get rejected on their next request.
    let user = match auth_state.repos.users().find_by_id(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return auth_error_response(AuthError::UserNotFound),
        Err(e) => {
            error!("Failed to load user for token check: {}", e);
            return internal_error_response();
        }
    };
    if !user.enabled {
        return auth_error_response(AuthError::AccountDisabled);
    }

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from_user(&user));

    next.run(request).await
}

/// Admin middleware - must be layered after [`auth_middleware`].
///
/// Opens for the ADMIN role and for accounts holding the SYSTEM_ADMIN or
/// DASHBOARD_VIEW permission, directly or through a role.
pub async fn admin_middleware(
    State(auth_state): State<AuthState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthenticatedUser>().cloned() else {
        return auth_error_response(AuthError::MissingToken);
    };

    match auth_state.authorization().can_access_admin(&user.user_id).await {
        Ok(true) => next.run(request).await,
        Ok(false) => auth_error_response(AuthError::InsufficientPermissions),
        Err(e) => {
            error!("Admin access check failed for {}: {}", user.username, e);
            internal_error_response()
        }
    }
}

/// Create an authentication error response
fn auth_error_response(error: AuthError) -> Response {
    let status = match error {
        AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
        _ => StatusCode::UNAUTHORIZED,
    };

    let body = Json(json!({
        "success": false,
        "error": error.to_string()
    }));

    (status, body).into_response()
}

fn internal_error_response() -> Response {
    let body = Json(json!({
        "success": false,
        "error": "Internal server error"
    }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_token("abc.def.ghi"), None);
    }

    #[test]
    fn test_auth_error_statuses() {
        let forbidden = auth_error_response(AuthError::InsufficientPermissions);
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        for error in [
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::ExpiredToken,
            AuthError::AccountDisabled,
            AuthError::UserNotFound,
        ] {
            assert_eq!(auth_error_response(error).status(), StatusCode::UNAUTHORIZED);
        }
    }
}
