//! Inventory domain module.
//!
//! Items, movements and the stock ledger that reconciles one against the
//! other, plus the read-only projections built on top (dashboard statistics,
//! report rows, labels). Pure domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod ledger;
pub mod movement;
pub mod reports;
pub mod snapshot;
pub mod stats;

pub use item::{Item, ItemCategory, ItemUpdate, NewItem};
pub use movement::{
    ItemMovement, MovementLine, MovementType, MovementUpdate, NewMovement, ProposedLine,
    SellerChange,
};
pub use snapshot::InventorySnapshot;
pub use stats::{DashboardStats, compute_stats};
