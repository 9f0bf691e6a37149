use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use stocktrack_infra::ServiceResult;

use crate::app::errors;

pub mod auth;
pub mod items;
pub mod movements;
pub mod parties;
pub mod reports;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/stats", get(system::stats))
        .route("/labels", post(reports::labels))
        .nest("/items", items::router())
        .nest("/sellers", parties::sellers_router())
        .nest("/responsibles", parties::responsibles_router())
        .nest("/movements", movements::router())
        .nest("/reports", reports::router())
}

/// Serialize a successful result with `status`, or map the error.
pub(crate) fn respond<T: Serialize>(
    status: StatusCode,
    result: ServiceResult<T>,
) -> axum::response::Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub(crate) fn no_content(result: ServiceResult<()>) -> axum::response::Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
