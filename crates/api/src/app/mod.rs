//! HTTP API application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use stocktrack_auth::SessionStore;
use stocktrack_infra::{InventoryGateway, InventoryService};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// The orchestrator as shared by all handlers.
pub type SharedService = Arc<InventoryService<Arc<dyn InventoryGateway>>>;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(service: SharedService, sessions: Arc<SessionStore>) -> Router {
    // Protected routes: require a live session.
    let protected = routes::router()
        .layer(Extension(service))
        .layer(axum::middleware::from_fn_with_state(
            sessions.clone(),
            middleware::auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .layer(Extension(sessions));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(ServiceBuilder::new())
}
