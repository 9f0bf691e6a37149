//! Optimistic concurrency tokens for stored records.

use crate::error::{DomainError, DomainResult};

/// Optimistic concurrency expectation for a record write.
///
/// Records carry a `version` that the store bumps on every write. A writer that
/// read version `n` passes `Exact(n)`; if someone else wrote in between the
/// store rejects the write instead of silently losing an update.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (administrative overwrites, migrations, etc.).
    Any,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
