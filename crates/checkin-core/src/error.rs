//! Errors surfaced by engine operations.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::{PersonUid, ValidationError};

/// Errors from attendance operations.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// An explicitly identified person does not exist.
    ///
    /// Distinct from a known person who never checked in.
    #[error("person not found: {0}")]
    PersonNotFound(PersonUid),

    /// The event store or person directory failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Caller input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AttendanceError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::PersonNotFound(_))
    }
}
