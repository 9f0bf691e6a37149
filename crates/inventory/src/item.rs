use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrack_core::{DomainError, DomainResult, Entity, ItemId, ValidationError};

/// Closed set of stock categories.
///
/// Serialized with the labels operators see on screen and in reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    #[serde(rename = "Máquinas VX")]
    VxMachines,
    #[serde(rename = "Máquinas Digital")]
    DigitalMachines,
    #[serde(rename = "Notebook/PC")]
    Computers,
    #[serde(rename = "Suprimentos")]
    Supplies,
    #[serde(rename = "Material de Escritório")]
    OfficeSupplies,
    #[serde(rename = "BANCADAS")]
    Benches,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 6] = [
        ItemCategory::VxMachines,
        ItemCategory::DigitalMachines,
        ItemCategory::Computers,
        ItemCategory::Supplies,
        ItemCategory::OfficeSupplies,
        ItemCategory::Benches,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ItemCategory::VxMachines => "Máquinas VX",
            ItemCategory::DigitalMachines => "Máquinas Digital",
            ItemCategory::Computers => "Notebook/PC",
            ItemCategory::Supplies => "Suprimentos",
            ItemCategory::OfficeSupplies => "Material de Escritório",
            ItemCategory::Benches => "BANCADAS",
        }
    }
}

impl core::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ItemCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemCategory::ALL
            .into_iter()
            .find(|c| c.label() == s.trim())
            .ok_or_else(|| ValidationError::field("category", format!("unknown category '{s}'")).into())
    }
}

/// A stock item and its quantity buckets.
///
/// `available_quantity + in_use_quantity == total_quantity` holds for every
/// record a gateway hands out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub code: String,
    pub name: String,
    pub category: ItemCategory,
    pub total_quantity: i64,
    pub available_quantity: i64,
    pub in_use_quantity: i64,
    /// Optimistic concurrency token, assigned by the gateway (0 = never stored).
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub category: ItemCategory,
    pub total_quantity: i64,
}

/// Direct edit of an item (None keeps the current value).
///
/// Quantity buckets other than the total are owned by movement reconciliation
/// and cannot be edited here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category: Option<ItemCategory>,
    pub total_quantity: Option<i64>,
}

impl Item {
    /// Build a new item with all of its stock available.
    pub fn create(id: ItemId, input: NewItem, at: DateTime<Utc>) -> DomainResult<Self> {
        let code = non_blank("code", &input.code)?;
        let name = non_blank("name", &input.name)?;
        if input.total_quantity < 0 {
            return Err(ValidationError::field("total_quantity", "cannot be negative").into());
        }

        Ok(Self {
            id,
            code,
            name,
            category: input.category,
            total_quantity: input.total_quantity,
            available_quantity: input.total_quantity,
            in_use_quantity: 0,
            version: 0,
            created_at: at,
            updated_at: at,
        })
    }

    /// Return the edited item.
    ///
    /// A new total is split as `available = total - in_use`; totals below the
    /// units currently checked out are rejected.
    pub fn edited(&self, update: ItemUpdate, at: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(code) = update.code {
            next.code = non_blank("code", &code)?;
        }
        if let Some(name) = update.name {
            next.name = non_blank("name", &name)?;
        }
        if let Some(category) = update.category {
            next.category = category;
        }
        if let Some(total) = update.total_quantity {
            if total < 0 {
                return Err(ValidationError::field("total_quantity", "cannot be negative").into());
            }
            if total < self.in_use_quantity {
                return Err(ValidationError::TotalBelowInUse {
                    total,
                    in_use: self.in_use_quantity,
                }
                .into());
            }
            next.total_quantity = total;
            next.available_quantity = total - self.in_use_quantity;
        }

        next.updated_at = at;
        Ok(next)
    }

    /// Items with units checked out cannot be deleted.
    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.in_use_quantity > 0 {
            return Err(DomainError::conflict(format!(
                "item '{}' has {} unit(s) in use and cannot be deleted",
                self.code, self.in_use_quantity
            )));
        }
        Ok(())
    }

    /// Whether the quantity buckets add up and none is negative.
    pub fn is_balanced(&self) -> bool {
        self.available_quantity >= 0
            && self.in_use_quantity >= 0
            && self.available_quantity + self.in_use_quantity == self.total_quantity
    }
}

impl Entity for Item {
    type Id = ItemId;
    const KIND: &'static str = "item";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn non_blank(field: &'static str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::field(field, format!("{field} cannot be empty")).into());
    }
    Ok(value.to_string())
}
