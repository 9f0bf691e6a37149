//! Parties domain module (sellers and responsibles).
//!
//! Sellers are points of sale a checkout may be attributed to; responsibles are
//! the people accountable for checked-out items. Pure record validation only
//! (no IO, no HTTP, no storage).

pub mod party;
pub mod responsible;
pub mod seller;

pub use party::{ContactInfo, PartyDetails, PartyUpdate};
pub use responsible::Responsible;
pub use seller::Seller;
