use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use stocktrack_core::ItemId;
use stocktrack_inventory::reports::ItemFilter;
use stocktrack_inventory::{ItemUpdate, NewItem};

use crate::app::{errors, SharedService};

use super::{no_content, respond};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/by-code/:code", get(get_item_by_code))
        .route("/:id", get(get_item).patch(update_item).delete(delete_item))
}

pub async fn list_items(
    Extension(service): Extension<SharedService>,
    Query(filter): Query<ItemFilter>,
) -> axum::response::Response {
    let result = service
        .list_items()
        .await
        .map(|items| items.into_iter().filter(|i| filter.matches(i)).collect::<Vec<_>>());
    respond(StatusCode::OK, result)
}

pub async fn create_item(
    Extension(service): Extension<SharedService>,
    Json(body): Json<NewItem>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, service.create_item(body).await)
}

pub async fn get_item(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(res) => return res,
    };
    respond(StatusCode::OK, service.get_item(id).await)
}

pub async fn get_item_by_code(
    Extension(service): Extension<SharedService>,
    Path(code): Path<String>,
) -> axum::response::Response {
    respond(StatusCode::OK, service.find_item_by_code(&code).await)
}

pub async fn update_item(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
    Json(body): Json<ItemUpdate>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(res) => return res,
    };
    respond(StatusCode::OK, service.update_item(id, body).await)
}

pub async fn delete_item(
    Extension(service): Extension<SharedService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(res) => return res,
    };
    no_content(service.delete_item(id).await)
}
