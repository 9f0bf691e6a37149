use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrack_core::{DomainResult, Entity, SellerId};

use crate::party::{ContactInfo, PartyDetails, PartyUpdate};

/// A point of sale that checkouts may be attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Seller {
    /// Validate registration input and build a new seller record.
    pub fn register(id: SellerId, details: PartyDetails, at: DateTime<Utc>) -> DomainResult<Self> {
        let (name, contact) = details.normalized()?;
        Ok(Self {
            id,
            name,
            contact,
            created_at: at,
            updated_at: at,
        })
    }

    /// Return the edited record; `self` is left untouched.
    pub fn updated(&self, update: PartyUpdate, at: DateTime<Utc>) -> DomainResult<Self> {
        let (name, contact) = update.merge(&self.name, &self.contact)?;
        Ok(Self {
            name,
            contact,
            updated_at: at,
            ..self.clone()
        })
    }
}

impl Entity for Seller {
    type Id = SellerId;
    const KIND: &'static str = "seller";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
