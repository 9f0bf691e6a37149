//! Read-only projections consumed by document generators.
//!
//! These never mutate their inputs; rendering (PDF/XLSX) happens elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrack_core::{DomainResult, MovementId, ValidationError};

use crate::item::{Item, ItemCategory};
use crate::movement::{ItemMovement, MovementType};

/// Placeholder shown when a movement has no seller.
pub const NO_SELLER: &str = "N/A";

/// Upper bound on labels produced by one request.
pub const MAX_LABELS: u64 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    #[serde(default)]
    pub category: Option<ItemCategory>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        self.category.is_none_or(|c| item.category == c)
    }

    pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|i| self.matches(i)).collect()
    }
}

/// Date window (inclusive on both ends) and optional movement type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub kind: Option<MovementType>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &ItemMovement) -> bool {
        self.from.is_none_or(|from| movement.date >= from)
            && self.to.is_none_or(|to| movement.date <= to)
            && self.kind.is_none_or(|k| movement.kind == k)
    }

    pub fn apply<'a>(&self, movements: &'a [ItemMovement]) -> Vec<&'a ItemMovement> {
        movements.iter().filter(|m| self.matches(m)).collect()
    }
}

/// Human-facing label for a movement type, as printed on reports.
pub fn kind_label(kind: MovementType) -> &'static str {
    match kind {
        MovementType::Checkout => "Saída",
        MovementType::Return => "Devolução",
    }
}

/// One row per movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementSummaryRow {
    pub id: MovementId,
    pub kind: String,
    pub responsible: String,
    pub seller: String,
    pub date: DateTime<Utc>,
    pub total_quantity: i64,
}

/// One row per movement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDetailRow {
    pub movement_id: MovementId,
    pub kind: String,
    pub date: DateTime<Utc>,
    pub item_code: String,
    pub item_name: String,
    pub quantity: i64,
    pub responsible: String,
    pub seller: String,
}

fn seller_label(movement: &ItemMovement) -> String {
    movement
        .seller_name
        .clone()
        .unwrap_or_else(|| NO_SELLER.to_string())
}

pub fn movement_summary_rows<'a, I>(movements: I) -> Vec<MovementSummaryRow>
where
    I: IntoIterator<Item = &'a ItemMovement>,
{
    movements
        .into_iter()
        .map(|m| MovementSummaryRow {
            id: m.id,
            kind: kind_label(m.kind).to_string(),
            responsible: m.responsible_name.clone(),
            seller: seller_label(m),
            date: m.date,
            total_quantity: m.total_quantity(),
        })
        .collect()
}

pub fn movement_detail_rows<'a, I>(movements: I) -> Vec<MovementDetailRow>
where
    I: IntoIterator<Item = &'a ItemMovement>,
{
    movements
        .into_iter()
        .flat_map(|m| {
            m.lines.iter().map(move |line| MovementDetailRow {
                movement_id: m.id,
                kind: kind_label(m.kind).to_string(),
                date: m.date,
                item_code: line.item_code.clone(),
                item_name: line.item_name.clone(),
                quantity: line.quantity,
                responsible: m.responsible_name.clone(),
                seller: seller_label(m),
            })
        })
        .collect()
}

/// Request for a run of numbered labels sharing one phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRange {
    pub start: u64,
    pub end: u64,
    #[serde(default)]
    pub phrase: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub number: u64,
    pub phrase: String,
}

impl LabelRange {
    pub fn validate(&self) -> DomainResult<()> {
        if self.start < 1 {
            return Err(ValidationError::field("start", "must be at least 1").into());
        }
        if self.start > self.end {
            return Err(ValidationError::field("end", "must not be lower than start").into());
        }
        if self.end - self.start + 1 > MAX_LABELS {
            return Err(ValidationError::field(
                "end",
                format!("at most {MAX_LABELS} labels per request"),
            )
            .into());
        }
        Ok(())
    }

    pub fn labels(&self) -> DomainResult<Vec<Label>> {
        self.validate()?;
        let phrase = self.phrase.trim();
        Ok((self.start..=self.end)
            .map(|number| Label {
                number,
                phrase: phrase.to_string(),
            })
            .collect())
    }
}
