use axum::{extract::Extension, http::StatusCode};

use crate::app::SharedService;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn stats(Extension(service): Extension<SharedService>) -> axum::response::Response {
    super::respond(StatusCode::OK, service.stats().await)
}
