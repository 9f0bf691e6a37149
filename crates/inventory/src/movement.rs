use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrack_core::{
    DomainError, DomainResult, Entity, ItemId, MovementId, ResponsibleId, SellerId, ValidationError,
};
use stocktrack_parties::{Responsible, Seller};

use crate::item::Item;

/// Direction of a movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Items leave controlled storage: available -> in use.
    Checkout,
    /// Items come back: in use -> available.
    Return,
}

impl MovementType {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::Checkout => "checkout",
            MovementType::Return => "return",
        }
    }

    /// The movement type whose delta undoes this one.
    pub fn opposite(self) -> Self {
        match self {
            MovementType::Checkout => MovementType::Return,
            MovementType::Return => MovementType::Checkout,
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "checkout" => Ok(MovementType::Checkout),
            "return" => Ok(MovementType::Return),
            other => Err(ValidationError::field("type", format!("unknown movement type '{other}'")).into()),
        }
    }
}

/// A requested `(item, quantity)` pair, before validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

/// One line of a persisted movement.
///
/// `item_code`/`item_name` are copied when the movement is recorded and are
/// not kept in sync with later item edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLine {
    pub item_id: ItemId,
    pub item_code: String,
    pub item_name: String,
    pub quantity: i64,
}

impl MovementLine {
    pub fn snapshot(item: &Item, quantity: i64) -> Self {
        Self {
            item_id: item.id,
            item_code: item.code.clone(),
            item_name: item.name.clone(),
            quantity,
        }
    }
}

/// A recorded checkout or return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMovement {
    pub id: MovementId,
    #[serde(rename = "type")]
    pub kind: MovementType,
    pub responsible_id: ResponsibleId,
    pub responsible_name: String,
    pub seller_id: Option<SellerId>,
    pub seller_name: Option<String>,
    /// Business date of the movement (may be backdated by the operator).
    pub date: DateTime<Utc>,
    pub lines: Vec<MovementLine>,
    /// Checkout that stocks a newly opened point of sale.
    #[serde(default)]
    pub new_point: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for `create_checkout` / `create_return`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub responsible_id: ResponsibleId,
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    /// Defaults to the time of recording.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub lines: Vec<ProposedLine>,
    #[serde(default)]
    pub new_point: bool,
}

/// Metadata reassignment for an existing movement.
///
/// Line quantities are immutable; changing them means deleting the movement
/// and recording a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementUpdate {
    #[serde(default)]
    pub responsible_id: Option<ResponsibleId>,
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    /// Detach the seller (ignored when `seller_id` is set).
    #[serde(default)]
    pub clear_seller: bool,
}

impl ItemMovement {
    /// Assemble a movement record from already-resolved references.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        id: MovementId,
        kind: MovementType,
        responsible: &Responsible,
        seller: Option<&Seller>,
        date: DateTime<Utc>,
        lines: Vec<MovementLine>,
        new_point: bool,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if responsible.name.trim().is_empty() {
            return Err(ValidationError::MissingResponsible.into());
        }
        if lines.is_empty() {
            return Err(ValidationError::EmptyLineList.into());
        }
        if let Some(line) = lines.iter().find(|l| l.quantity <= 0) {
            return Err(ValidationError::InvalidQuantity {
                item_id: line.item_id,
                item_name: line.item_name.clone(),
                quantity: line.quantity,
            }
            .into());
        }

        Ok(Self {
            id,
            kind,
            responsible_id: responsible.id,
            responsible_name: responsible.name.clone(),
            seller_id: seller.map(|s| s.id),
            seller_name: seller.map(|s| s.name.clone()),
            date,
            lines,
            new_point,
            created_at: at,
        })
    }

    /// Return a copy pointing at a different responsible and/or seller.
    pub fn reassigned(&self, responsible: Option<&Responsible>, seller: SellerChange<'_>) -> Self {
        let mut next = self.clone();
        if let Some(r) = responsible {
            next.responsible_id = r.id;
            next.responsible_name = r.name.clone();
        }
        match seller {
            SellerChange::Keep => {}
            SellerChange::Assign(s) => {
                next.seller_id = Some(s.id);
                next.seller_name = Some(s.name.clone());
            }
            SellerChange::Clear => {
                next.seller_id = None;
                next.seller_name = None;
            }
        }
        next
    }

    /// Sum of all line quantities.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn references_seller(&self, seller_id: SellerId) -> bool {
        self.seller_id == Some(seller_id)
    }

    /// By id, or by name for movements recorded against a free-text name.
    pub fn references_responsible(&self, responsible: &Responsible) -> bool {
        self.responsible_id == responsible.id || responsible.matches_name(&self.responsible_name)
    }
}

/// Resolved seller reassignment.
#[derive(Debug, Copy, Clone)]
pub enum SellerChange<'a> {
    Keep,
    Assign(&'a Seller),
    Clear,
}

impl Entity for ItemMovement {
    type Id = MovementId;
    const KIND: &'static str = "movement";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
