//! Persistence of the pending nomination ledger

use crate::domain::vote::Ledger;

pub mod db;
pub mod error;
pub mod ledger;
pub(crate) mod schema;

use error::StorageError;

/// Shared table of pending nominations.
///
/// The store gives no isolation between sessions: `read_all` is a snapshot that may be stale
/// as soon as it returns, and `replace_all` overwrites whatever other writers stored in the
/// meantime (last writer wins on the whole ledger). Callers re-read after every write before
/// making decisions that depend on the stored state.
pub trait LedgerStore {
    fn read_all(&mut self) -> Result<Ledger, StorageError>;

    fn replace_all(&mut self, ledger: &Ledger) -> Result<(), StorageError>;
}
