use thiserror::Error;

use agrichain_core::DomainError;

use crate::event_store::EventStoreError;

/// Failure of a ledger operation.
///
/// `Domain` errors are deterministic rejections (nothing was written). The other
/// variants come from the journal or the process and are not the caller's fault.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("journal error: {0}")]
    Journal(#[from] EventStoreError),

    #[error("failed to decode journal event at position {position}: {message}")]
    Deserialize { position: u64, message: String },

    #[error("ledger state is inconsistent: {0}")]
    Inconsistent(String),

    #[error("ledger state lock poisoned")]
    Poisoned,
}

impl LedgerError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Another writer committed to the shared journal first.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Journal(EventStoreError::Concurrency(_)))
    }
}
