//! Ledger errors.

use bourse_tracker_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The underlying store failed.
    #[error("ledger store error: {0}")]
    Store(#[from] StoreError),

    /// The document could not be serialized.
    #[error("ledger serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Conflicts or transient failures persisted through every attempt.
    /// The update was not recorded.
    #[error("ledger update failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: String,
    },
}

impl LedgerError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::Json(_) | Self::RetriesExhausted { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
