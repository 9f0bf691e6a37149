use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrack_core::{DomainResult, Entity, ResponsibleId};

use crate::party::{ContactInfo, PartyDetails, PartyUpdate};

/// The person accountable for items checked out under their name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsible {
    pub id: ResponsibleId,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Responsible {
    pub fn register(
        id: ResponsibleId,
        details: PartyDetails,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let (name, contact) = details.normalized()?;
        Ok(Self {
            id,
            name,
            contact,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn updated(&self, update: PartyUpdate, at: DateTime<Utc>) -> DomainResult<Self> {
        let (name, contact) = update.merge(&self.name, &self.contact)?;
        Ok(Self {
            name,
            contact,
            updated_at: at,
            ..self.clone()
        })
    }

    /// Whether a free-text name snapshot refers to this responsible.
    ///
    /// Older movements only carry the name, so matching is case-insensitive on
    /// the trimmed text.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

impl Entity for Responsible {
    type Id = ResponsibleId;
    const KIND: &'static str = "responsible";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
