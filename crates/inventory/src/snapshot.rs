use serde::{Deserialize, Serialize};

use stocktrack_parties::{Responsible, Seller};

use crate::item::Item;
use crate::movement::ItemMovement;
use crate::stats::{DashboardStats, compute_stats};

/// Read-only copy of every collection at one point in time.
///
/// Report projections and statistics read from a snapshot so they never
/// observe a movement halfway through reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub items: Vec<Item>,
    pub sellers: Vec<Seller>,
    pub responsibles: Vec<Responsible>,
    pub movements: Vec<ItemMovement>,
}

impl InventorySnapshot {
    pub fn stats(&self) -> DashboardStats {
        compute_stats(&self.items, &self.sellers, &self.responsibles, &self.movements)
    }
}
