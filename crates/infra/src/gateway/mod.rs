//! Data Access Gateway: durable CRUD for items, parties and movements.
//!
//! The gateway is the only path to storage. It hands out canonical records and
//! owns the item `version` counter: inserts start at 1 and every successful
//! update bumps it by one. Nothing here knows about stock rules; those live in
//! the inventory crate and are enforced by the service.
//!
//! Backends:
//! - [`InMemoryGateway`]: `RwLock`-guarded collections for tests/dev, with
//!   optional latency and fault injection.
//! - [`PostgresGateway`]: sqlx/PostgreSQL with the reference relational schema.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use stocktrack_core::{ExpectedVersion, ItemId, MovementId, ResponsibleId, SellerId};
use stocktrack_inventory::{Item, ItemMovement};
use stocktrack_parties::{Responsible, Seller};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{FaultPlan, InMemoryGateway};
pub use postgres::PostgresGateway;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway operation error.
///
/// These are infrastructure failures, distinct from domain validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{entity} {id} not found in storage")]
    NotFound { entity: &'static str, id: String },

    /// The stored record moved on since it was read.
    #[error("{entity} {id} version conflict: expected {expected:?}, found {actual}")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("gateway call {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl GatewayError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Names every gateway call, for fault injection and timeout reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    ListItems,
    GetItem,
    FindItemByCode,
    InsertItem,
    UpdateItem,
    DeleteItem,
    ListSellers,
    GetSeller,
    InsertSeller,
    UpdateSeller,
    DeleteSeller,
    ListResponsibles,
    GetResponsible,
    InsertResponsible,
    UpdateResponsible,
    DeleteResponsible,
    ListMovements,
    GetMovement,
    InsertMovement,
    UpdateMovement,
    DeleteMovement,
}

impl GatewayOp {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayOp::ListItems => "list_items",
            GatewayOp::GetItem => "get_item",
            GatewayOp::FindItemByCode => "find_item_by_code",
            GatewayOp::InsertItem => "insert_item",
            GatewayOp::UpdateItem => "update_item",
            GatewayOp::DeleteItem => "delete_item",
            GatewayOp::ListSellers => "list_sellers",
            GatewayOp::GetSeller => "get_seller",
            GatewayOp::InsertSeller => "insert_seller",
            GatewayOp::UpdateSeller => "update_seller",
            GatewayOp::DeleteSeller => "delete_seller",
            GatewayOp::ListResponsibles => "list_responsibles",
            GatewayOp::GetResponsible => "get_responsible",
            GatewayOp::InsertResponsible => "insert_responsible",
            GatewayOp::UpdateResponsible => "update_responsible",
            GatewayOp::DeleteResponsible => "delete_responsible",
            GatewayOp::ListMovements => "list_movements",
            GatewayOp::GetMovement => "get_movement",
            GatewayOp::InsertMovement => "insert_movement",
            GatewayOp::UpdateMovement => "update_movement",
            GatewayOp::DeleteMovement => "delete_movement",
        }
    }
}

impl core::fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable storage for every record the service manages.
///
/// Lists come back in insertion order. `insert_*` returns the stored record
/// (for items, with `version = 1`). `update_item` enforces `expected` against
/// the stored version and returns the record with the bumped version.
/// Deleting a missing record is `NotFound`.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn list_items(&self) -> GatewayResult<Vec<Item>>;
    async fn get_item(&self, id: ItemId) -> GatewayResult<Option<Item>>;
    async fn find_item_by_code(&self, code: &str) -> GatewayResult<Option<Item>>;
    async fn insert_item(&self, item: Item) -> GatewayResult<Item>;
    async fn update_item(&self, item: Item, expected: ExpectedVersion) -> GatewayResult<Item>;
    async fn delete_item(&self, id: ItemId) -> GatewayResult<()>;

    async fn list_sellers(&self) -> GatewayResult<Vec<Seller>>;
    async fn get_seller(&self, id: SellerId) -> GatewayResult<Option<Seller>>;
    async fn insert_seller(&self, seller: Seller) -> GatewayResult<Seller>;
    async fn update_seller(&self, seller: Seller) -> GatewayResult<Seller>;
    async fn delete_seller(&self, id: SellerId) -> GatewayResult<()>;

    async fn list_responsibles(&self) -> GatewayResult<Vec<Responsible>>;
    async fn get_responsible(&self, id: ResponsibleId) -> GatewayResult<Option<Responsible>>;
    async fn insert_responsible(&self, responsible: Responsible) -> GatewayResult<Responsible>;
    async fn update_responsible(&self, responsible: Responsible) -> GatewayResult<Responsible>;
    async fn delete_responsible(&self, id: ResponsibleId) -> GatewayResult<()>;

    async fn list_movements(&self) -> GatewayResult<Vec<ItemMovement>>;
    async fn get_movement(&self, id: MovementId) -> GatewayResult<Option<ItemMovement>>;
    /// Persist a movement together with its lines.
    async fn insert_movement(&self, movement: ItemMovement) -> GatewayResult<ItemMovement>;
    /// Replace movement header fields (responsible/seller snapshots); lines are
    /// left untouched.
    async fn update_movement(&self, movement: ItemMovement) -> GatewayResult<ItemMovement>;
    async fn delete_movement(&self, id: MovementId) -> GatewayResult<()>;
}

#[async_trait]
impl<G> InventoryGateway for Arc<G>
where
    G: InventoryGateway + ?Sized,
{
    async fn list_items(&self) -> GatewayResult<Vec<Item>> {
        (**self).list_items().await
    }

    async fn get_item(&self, id: ItemId) -> GatewayResult<Option<Item>> {
        (**self).get_item(id).await
    }

    async fn find_item_by_code(&self, code: &str) -> GatewayResult<Option<Item>> {
        (**self).find_item_by_code(code).await
    }

    async fn insert_item(&self, item: Item) -> GatewayResult<Item> {
        (**self).insert_item(item).await
    }

    async fn update_item(&self, item: Item, expected: ExpectedVersion) -> GatewayResult<Item> {
        (**self).update_item(item, expected).await
    }

    async fn delete_item(&self, id: ItemId) -> GatewayResult<()> {
        (**self).delete_item(id).await
    }

    async fn list_sellers(&self) -> GatewayResult<Vec<Seller>> {
        (**self).list_sellers().await
    }

    async fn get_seller(&self, id: SellerId) -> GatewayResult<Option<Seller>> {
        (**self).get_seller(id).await
    }

    async fn insert_seller(&self, seller: Seller) -> GatewayResult<Seller> {
        (**self).insert_seller(seller).await
    }

    async fn update_seller(&self, seller: Seller) -> GatewayResult<Seller> {
        (**self).update_seller(seller).await
    }

    async fn delete_seller(&self, id: SellerId) -> GatewayResult<()> {
        (**self).delete_seller(id).await
    }

    async fn list_responsibles(&self) -> GatewayResult<Vec<Responsible>> {
        (**self).list_responsibles().await
    }

    async fn get_responsible(&self, id: ResponsibleId) -> GatewayResult<Option<Responsible>> {
        (**self).get_responsible(id).await
    }

    async fn insert_responsible(&self, responsible: Responsible) -> GatewayResult<Responsible> {
        (**self).insert_responsible(responsible).await
    }

    async fn update_responsible(&self, responsible: Responsible) -> GatewayResult<Responsible> {
        (**self).update_responsible(responsible).await
    }

    async fn delete_responsible(&self, id: ResponsibleId) -> GatewayResult<()> {
        (**self).delete_responsible(id).await
    }

    async fn list_movements(&self) -> GatewayResult<Vec<ItemMovement>> {
        (**self).list_movements().await
    }

    async fn get_movement(&self, id: MovementId) -> GatewayResult<Option<ItemMovement>> {
        (**self).get_movement(id).await
    }

    async fn insert_movement(&self, movement: ItemMovement) -> GatewayResult<ItemMovement> {
        (**self).insert_movement(movement).await
    }

    async fn update_movement(&self, movement: ItemMovement) -> GatewayResult<ItemMovement> {
        (**self).update_movement(movement).await
    }

    async fn delete_movement(&self, id: MovementId) -> GatewayResult<()> {
        (**self).delete_movement(id).await
    }
}
