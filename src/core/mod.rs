//! Core module - blueprint records, lifecycle engine and storage

pub mod config;
pub mod entity;
pub mod identity;
pub mod lifecycle;
pub mod loader;
pub mod store;

pub use config::Config;
pub use entity::{BlueprintData, BlueprintRecord, ConnectionType, NewBlueprint, Status};
pub use identity::{BlueprintId, IdParseError};
pub use lifecycle::{
    archived_name, BlueprintError, BlueprintService, Session, StatusFilter, UpdateOutcome,
};
pub use loader::{BlueprintLoader, LoadError, LoadStats};
pub use store::{
    BlueprintStore, MemoryStore, RowLock, SqliteStore, StoreError, StoreTransaction,
    DEFAULT_LOCK_TIMEOUT,
};
