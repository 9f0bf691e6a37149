//! `stocktrack-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the inventory and
//! parties crates (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ValidationError};
pub use id::{ItemId, MovementId, ResponsibleId, SellerId};
pub use version::ExpectedVersion;
