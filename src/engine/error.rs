use thiserror::Error;

use crate::{catalog::error::CatalogError, domain::query::QueryError, storage::error::StorageError};

/// Why a user action failed. Every variant ends that one action and nothing else.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("invalid nomination: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("track not found, please try again")]
    NotFound,

    #[error("{0}")]
    AlreadyInPlaylist(String),

    #[error("music catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("vote ledger unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
}
