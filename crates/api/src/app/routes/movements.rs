use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use stocktrack_core::MovementId;
use stocktrack_inventory::reports::MovementFilter;
use stocktrack_inventory::{MovementUpdate, NewMovement};

use crate::app::{errors, SharedService};

use super::{no_content, respond};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_movements))
        .route("/checkout", post(create_checkout))
        .route("/return", post(create_return))
        .route(
            "/:id",
            get(get_movement).patch(update_movement).delete(delete_movement),
        )
}

pub async fn list_movements(
    Extension(service): Extension<SharedService>,
    Query(filter): Query<MovementFilter>,
) -> axum::response::Response {
    let result = service
        .list_movements()
        .await
        .map(|all| all.into_iter().filter(|m| filter.matches(m)).collect::<Vec<_>>());
    respond(StatusCode::OK, result)
}

pub async fn create_checkout(
    Extension(service): Extension<SharedService>,
    Json(body): Json<NewMovement>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, service.create_checkout(body).await)
}

pub async fn create_return(
    Extension(service): Extension<SharedService>,
    Json(body): Json<NewMovement>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, service.create_return(body).await)
}

pub async fn get_movement(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovementId = match errors::parse_id(&id, "movement") {
        Ok(v) => v,
        Err(res) => return res,
    };
    respond(StatusCode::OK, service.get_movement(id).await)
}

/// Reassign responsible/seller. Quantities cannot be edited in place.
pub async fn update_movement(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
    Json(body): Json<MovementUpdate>,
) -> axum::response::Response {
    let id: MovementId = match errors::parse_id(&id, "movement") {
        Ok(v) => v,
        Err(res) => return res,
    };
    respond(StatusCode::OK, service.update_movement(id, body).await)
}

pub async fn delete_movement(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovementId = match errors::parse_id(&id, "movement") {
        Ok(v) => v,
        Err(res) => return res,
    };
    no_content(service.delete_movement(id).await)
}
