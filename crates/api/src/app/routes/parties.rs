//! Sellers and responsibles share a shape; only the service calls differ.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use stocktrack_core::{ResponsibleId, SellerId};
use stocktrack_parties::{PartyDetails, PartyUpdate};

use crate::app::{errors, SharedService};

use super::{no_content, respond};

pub fn sellers_router() -> Router {
    Router::new()
        .route("/", get(list_sellers).post(create_seller))
        .route("/:id", get(get_seller).patch(update_seller).delete(delete_seller))
}

pub fn responsibles_router() -> Router {
    Router::new()
        .route("/", get(list_responsibles).post(create_responsible))
        .route(
            "/:id",
            get(get_responsible)
                .patch(update_responsible)
                .delete(delete_responsible),
        )
}

pub async fn list_sellers(Extension(service): Extension<SharedService>) -> axum::response::Response {
    respond(StatusCode::OK, service.list_sellers().await)
}

pub async fn create_seller(
    Extension(service): Extension<SharedService>,
    Json(body): Json<PartyDetails>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, service.create_seller(body).await)
}

pub async fn get_seller(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SellerId = match errors::parse_id(&id, "seller") {
        Ok(v) => v,
        Err(res) => return res,
    };
    respond(StatusCode::OK, service.get_seller(id).await)
}

pub async fn update_seller(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
    Json(body): Json<PartyUpdate>,
) -> axum::response::Response {
    let id: SellerId = match errors::parse_id(&id, "seller") {
        Ok(v) => v,
        Err(res) => return res,
    };
    respond(StatusCode::OK, service.update_seller(id, body).await)
}

pub async fn delete_seller(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SellerId = match errors::parse_id(&id, "seller") {
        Ok(v) => v,
        Err(res) => return res,
    };
    no_content(service.delete_seller(id).await)
}

pub async fn list_responsibles(
    Extension(service): Extension<SharedService>,
) -> axum::response::Response {
    respond(StatusCode::OK, service.list_responsibles().await)
}

pub async fn create_responsible(
    Extension(service): Extension<SharedService>,
    Json(body): Json<PartyDetails>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, service.create_responsible(body).await)
}

pub async fn get_responsible(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ResponsibleId = match errors::parse_id(&id, "responsible") {
        Ok(v) => v,
        Err(res) => return res,
    };
    respond(StatusCode::OK, service.get_responsible(id).await)
}

pub async fn update_responsible(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
    Json(body): Json<PartyUpdate>,
) -> axum::response::Response {
    let id: ResponsibleId = match errors::parse_id(&id, "responsible") {
        Ok(v) => v,
        Err(res) => return res,
    };
    respond(StatusCode::OK, service.update_responsible(id, body).await)
}

pub async fn delete_responsible(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ResponsibleId = match errors::parse_id(&id, "responsible") {
        Ok(v) => v,
        Err(res) => return res,
    };
    no_content(service.delete_responsible(id).await)
}
