use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use stocktrack_auth::{AuthError, Credentials, SessionStore};

use crate::app::{dto, errors};
use crate::middleware::extract_bearer;

pub async fn login(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Json(body): Json<Credentials>,
) -> axum::response::Response {
    match sessions.login(&body, Utc::now()) {
        Ok(session) => (StatusCode::OK, Json(dto::LoginResponse::from(session))).into_response(),
        Err(AuthError::InvalidCredentials) => errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            AuthError::InvalidCredentials.to_string(),
        ),
        Err(e) => errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "auth_unavailable", e.to_string()),
    }
}

/// Closing an unknown session is not an error; the caller ends up logged out
/// either way.
pub async fn logout(
    Extension(sessions): Extension<Arc<SessionStore>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let token = match extract_bearer(&headers) {
        Ok(t) => t,
        Err(status) => return status.into_response(),
    };

    match sessions.logout(token) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "auth_unavailable", e.to_string()),
    }
}
