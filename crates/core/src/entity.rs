//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Gateways use this to look records up by id without knowing their shape.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Human-readable entity name used in error messages ("item", "seller", ...).
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
