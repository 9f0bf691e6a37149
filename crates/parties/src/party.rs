use serde::{Deserialize, Serialize};

use stocktrack_core::{DomainResult, ValidationError};

/// Contact information shared by sellers and responsibles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub whatsapp: String,
    pub address: String,
}

/// Input for registering a seller or responsible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDetails {
    pub name: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default)]
    pub address: String,
}

/// Partial edit of a seller or responsible (None keeps the current value).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyUpdate {
    pub name: Option<String>,
    pub whatsapp: Option<String>,
    pub address: Option<String>,
}

impl PartyDetails {
    pub(crate) fn normalized(self) -> DomainResult<(String, ContactInfo)> {
        let name = normalize_name(&self.name)?;
        Ok((
            name,
            ContactInfo {
                whatsapp: self.whatsapp.trim().to_string(),
                address: self.address.trim().to_string(),
            },
        ))
    }
}

impl PartyUpdate {
    /// Merge this update over the current name/contact.
    pub(crate) fn merge(
        self,
        name: &str,
        contact: &ContactInfo,
    ) -> DomainResult<(String, ContactInfo)> {
        let name = match self.name {
            Some(n) => normalize_name(&n)?,
            None => name.to_string(),
        };
        let contact = ContactInfo {
            whatsapp: self
                .whatsapp
                .map(|w| w.trim().to_string())
                .unwrap_or_else(|| contact.whatsapp.clone()),
            address: self
                .address
                .map(|a| a.trim().to_string())
                .unwrap_or_else(|| contact.address.clone()),
        };
        Ok((name, contact))
    }
}

fn normalize_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::field("name", "name cannot be empty").into());
    }
    Ok(name.to_string())
}
