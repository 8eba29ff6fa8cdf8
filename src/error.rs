//! Sale operation errors.

use crate::interfaces::StorageError;
use crate::model::SaleId;

/// Result type for sale operations.
pub type Result<T> = std::result::Result<T, SaleError>;

/// Errors surfaced by the reconciliation and query services.
///
/// None of these are retried inside the crate.
#[derive(Debug, thiserror::Error)]
pub enum SaleError {
    /// One or more names did not resolve. Each field holds the offending
    /// name when that lookup failed.
    #[error("Invalid store, customer, or product details.")]
    InvalidReference {
        store: Option<String>,
        customer: Option<String>,
        product: Option<String>,
    },

    #[error("Sale ID mismatch.")]
    IdentifierMismatch { target: SaleId, payload: i64 },

    #[error("Sale {0} not found.")]
    NotFound(SaleId),

    /// The sale changed between read and commit. Re-fetch and resubmit.
    #[error("Sale {0} was modified concurrently.")]
    ConcurrencyConflict(SaleId),

    #[error("No sales found.")]
    EmptyResult,

    #[error("Sale date is required.")]
    MissingSaleDate,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Transport-neutral classification of a `SaleError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ClientError,
    NotFound,
    Conflict,
    Internal,
}

impl SaleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SaleError::InvalidReference { .. }
            | SaleError::IdentifierMismatch { .. }
            | SaleError::EmptyResult
            | SaleError::MissingSaleDate => ErrorKind::ClientError,
            SaleError::NotFound(_) => ErrorKind::NotFound,
            SaleError::ConcurrencyConflict(_) => ErrorKind::Conflict,
            SaleError::Storage(_) => ErrorKind::Internal,
        }
    }
}
