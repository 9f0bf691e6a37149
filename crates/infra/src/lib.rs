//! Infrastructure layer: storage gateways, configuration and the movement
//! orchestrator that ties them to the inventory domain.

pub mod config;
pub mod gateway;
pub mod service;

#[cfg(test)]
mod integration_tests;

pub use config::ServiceConfig;
pub use gateway::{
    FaultPlan, GatewayError, GatewayOp, GatewayResult, InMemoryGateway, InventoryGateway,
    PostgresGateway,
};
pub use service::{InventoryService, ServiceError, ServiceResult};
