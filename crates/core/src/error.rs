//! Domain error model.

use thiserror::Error;

use crate::id::ItemId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Client-correctable input failure.
///
/// Always raised before anything is mutated, so the caller can fix the input
/// and retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A line references an item that does not exist.
    #[error("item {item_id} not found")]
    ItemNotFound { item_id: ItemId },

    /// A line quantity is zero or negative.
    #[error("invalid quantity {quantity} for item '{item_name}'")]
    InvalidQuantity {
        item_id: ItemId,
        item_name: String,
        quantity: i64,
    },

    /// A line asks for more than the item's ceiling (available stock for
    /// checkouts, in-use stock for returns).
    #[error("insufficient stock for item '{item_name}': requested {requested}, only {limit} {bucket}")]
    InsufficientStock {
        item_id: ItemId,
        item_name: String,
        requested: i64,
        limit: i64,
        bucket: &'static str,
    },

    #[error("a responsible with a non-empty name is required")]
    MissingResponsible,

    #[error("a movement needs at least one line item")]
    EmptyLineList,

    /// An item edit would leave fewer units in total than are checked out.
    #[error("total quantity {total} is below the {in_use} units currently in use")]
    TotalBelowInUse { total: i64, in_use: i64 },

    /// A plain field failed validation (e.g. empty name).
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing records, blocked operations). Storage failures belong to infra.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist (any longer).
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The operation is blocked by another record (e.g. an item still in use).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
