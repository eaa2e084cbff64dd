//! Record store boundary for blueprint records
//!
//! A store hands out transactions. Every read and write of the lifecycle
//! engine goes through one [`StoreTransaction`], which:
//! - takes exclusive row locks when asked with [`RowLock::ForUpdate`]
//! - makes its writes visible to others only on [`StoreTransaction::commit`]
//! - rolls back and releases its locks when dropped without committing

mod memory;
mod sqlite;

pub use memory::{MemoryStore, MemoryTransaction};
pub use sqlite::{SqliteStore, SqliteTransaction};

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::entity::{BlueprintRecord, NewBlueprint};

/// How long a transaction waits for a contended lock before giving up
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Locking mode for a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    /// Plain read of committed state
    Unlocked,
    /// Exclusive lock on the row (or the name slot, when reading by name)
    /// held until the transaction ends
    ForUpdate,
}

/// A source of blueprint transactions
pub trait BlueprintStore: Send + Sync {
    type Transaction: StoreTransaction;

    /// Start a transaction
    fn begin(&self) -> Result<Self::Transaction, StoreError>;
}

/// One unit of work against a store
pub trait StoreTransaction {
    /// Find the record currently carrying `name`
    fn find_by_name(&mut self, name: &str, lock: RowLock)
        -> Result<Option<BlueprintRecord>, StoreError>;

    /// Find a record by row id
    fn find_by_id(&mut self, id: i64, lock: RowLock) -> Result<Option<BlueprintRecord>, StoreError>;

    /// All records ordered by id
    fn list(&mut self) -> Result<Vec<BlueprintRecord>, StoreError>;

    /// Insert a record and assign its id
    fn insert(&mut self, record: NewBlueprint) -> Result<BlueprintRecord, StoreError>;

    /// Overwrite an existing record, matched by id
    fn save(&mut self, record: &BlueprintRecord) -> Result<(), StoreError>;

    /// Publish all writes and release locks
    fn commit(self) -> Result<(), StoreError>;
}

/// Errors raised by record stores
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("Timed out waiting for a lock on {resource}")]
    #[diagnostic(
        code(blueprints::store::lock_timeout),
        help("Another operation holds the record; retry the whole operation")
    )]
    LockTimeout { resource: String },

    #[error("A blueprint named '{name}' is already stored")]
    #[diagnostic(code(blueprints::store::unique_violation))]
    UniqueViolation { name: String },

    #[error("Blueprint row {id} does not exist")]
    #[diagnostic(code(blueprints::store::missing_row))]
    MissingRow { id: i64 },

    #[error("Stored blueprint data is corrupt: {message}")]
    #[diagnostic(code(blueprints::store::corrupt))]
    Corrupt { message: String },

    #[error("Database error: {0}")]
    #[diagnostic(code(blueprints::store::database))]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(blueprints::store::io))]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Contention failures that may succeed if the caller retries
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. })
    }
}
