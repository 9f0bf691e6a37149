//! Report data for the document generators. Rendering happens client-side.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use stocktrack_inventory::reports::{
    movement_detail_rows, movement_summary_rows, ItemFilter, LabelRange, MovementFilter,
};

use crate::app::{dto, errors, SharedService};

use super::respond;

pub fn router() -> Router {
    Router::new()
        .route("/inventory", get(inventory_report))
        .route("/movements", get(movement_report))
}

pub async fn inventory_report(
    Extension(service): Extension<SharedService>,
    Query(filter): Query<ItemFilter>,
) -> axum::response::Response {
    let result = service.list_items().await.map(|items| {
        let items: Vec<_> = items.into_iter().filter(|i| filter.matches(i)).collect();
        dto::InventoryReport {
            generated_at: Utc::now(),
            count: items.len(),
            items,
        }
    });
    respond(StatusCode::OK, result)
}

pub async fn movement_report(
    Extension(service): Extension<SharedService>,
    Query(filter): Query<MovementFilter>,
) -> axum::response::Response {
    let result = service.list_movements().await.map(|all| {
        let selected = filter.apply(&all);
        dto::MovementReport {
            generated_at: Utc::now(),
            summary: movement_summary_rows(selected.iter().copied()),
            detail: movement_detail_rows(selected.iter().copied()),
        }
    });
    respond(StatusCode::OK, result)
}

pub async fn labels(Json(body): Json<LabelRange>) -> axum::response::Response {
    match body.labels() {
        Ok(labels) => (
            StatusCode::OK,
            Json(dto::LabelSheet {
                count: labels.len(),
                labels,
            }),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
