use chrono::{DateTime, Utc};
use serde::Serialize;

use stocktrack_auth::Session;
use stocktrack_inventory::reports::{Label, MovementDetailRow, MovementSummaryRow};
use stocktrack_inventory::Item;

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token.to_string(),
            username: session.username,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InventoryReport {
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize)]
pub struct MovementReport {
    pub generated_at: DateTime<Utc>,
    pub summary: Vec<MovementSummaryRow>,
    pub detail: Vec<MovementDetailRow>,
}

#[derive(Debug, Serialize)]
pub struct LabelSheet {
    pub count: usize,
    pub labels: Vec<Label>,
}
