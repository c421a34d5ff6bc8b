use thiserror::Error;

use crate::domain::vote::LedgerError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored ledger is corrupt: {0}")]
    CorruptLedger(String),

    #[error("stored ledger breaks an invariant: {0}")]
    InvalidLedger(#[from] LedgerError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
