//! In-memory record store with per-row locks
//!
//! Locks are keyed by blueprint name (the slot a create reserves) or by row
//! id. Operations on different keys never wait on each other. Writes are
//! buffered in the transaction and published in one step on commit.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::{BlueprintStore, RowLock, StoreError, StoreTransaction, DEFAULT_LOCK_TIMEOUT};
use crate::core::entity::{BlueprintRecord, NewBlueprint};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Name(String),
    Id(i64),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Name(name) => write!(f, "blueprint name '{}'", name),
            LockKey::Id(id) => write!(f, "blueprint row {}", id),
        }
    }
}

#[derive(Debug, Default)]
struct Rows {
    records: BTreeMap<i64, BlueprintRecord>,
    last_id: i64,
}

#[derive(Debug)]
struct Shared {
    rows: Mutex<Rows>,
    held: Mutex<HashSet<LockKey>>,
    released: Condvar,
    lock_timeout: Duration,
}

/// Blueprint store kept in process memory
///
/// Cloning yields another handle to the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                rows: Mutex::new(Rows::default()),
                held: Mutex::new(HashSet::new()),
                released: Condvar::new(),
                lock_timeout,
            }),
        }
    }

    /// Number of committed records
    pub fn len(&self) -> usize {
        lock_ignoring_poison(&self.shared.rows).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlueprintStore for MemoryStore {
    type Transaction = MemoryTransaction;

    fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        Ok(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            locks: Vec::new(),
            writes: BTreeMap::new(),
        })
    }
}

/// Transaction over a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    locks: Vec<LockKey>,
    writes: BTreeMap<i64, BlueprintRecord>,
}

impl MemoryTransaction {
    fn lock(&mut self, key: LockKey) -> Result<(), StoreError> {
        if self.locks.contains(&key) {
            return Ok(());
        }

        let deadline = Instant::now() + self.shared.lock_timeout;
        let mut held = lock_ignoring_poison(&self.shared.held);
        if held.contains(&key) {
            debug!(resource = %key, "waiting for row lock");
        }
        while held.contains(&key) {
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::LockTimeout {
                    resource: key.to_string(),
                });
            }
            let (guard, _) = self
                .shared
                .released
                .wait_timeout(held, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            held = guard;
        }
        held.insert(key.clone());
        drop(held);

        self.locks.push(key);
        Ok(())
    }

    fn current(&self, id: i64) -> Option<BlueprintRecord> {
        if let Some(record) = self.writes.get(&id) {
            return Some(record.clone());
        }
        lock_ignoring_poison(&self.shared.rows).records.get(&id).cloned()
    }

    /// First record carrying `name`, own writes shadowing committed rows
    fn find_name(&self, name: &str, skip_id: Option<i64>) -> Option<BlueprintRecord> {
        let matches = |r: &&BlueprintRecord| r.name == name && Some(r.id) != skip_id;
        if let Some(record) = self.writes.values().find(matches) {
            return Some(record.clone());
        }
        lock_ignoring_poison(&self.shared.rows)
            .records
            .values()
            .filter(|r| !self.writes.contains_key(&r.id))
            .find(matches)
            .cloned()
    }

    fn lookup_name(&self, name: &str) -> Option<BlueprintRecord> {
        self.find_name(name, None)
    }
}

impl StoreTransaction for MemoryTransaction {
    fn find_by_name(
        &mut self,
        name: &str,
        lock: RowLock,
    ) -> Result<Option<BlueprintRecord>, StoreError> {
        if lock == RowLock::Unlocked {
            return Ok(self.lookup_name(name));
        }

        // name slot first, then the row: nothing takes them in the other order
        self.lock(LockKey::Name(name.to_string()))?;
        let Some(found) = self.lookup_name(name) else {
            return Ok(None);
        };
        self.lock(LockKey::Id(found.id))?;

        // the row may have been archived under a new name while we waited
        Ok(self.current(found.id).filter(|r| r.name == name))
    }

    fn find_by_id(&mut self, id: i64, lock: RowLock) -> Result<Option<BlueprintRecord>, StoreError> {
        if lock == RowLock::ForUpdate {
            self.lock(LockKey::Id(id))?;
        }
        Ok(self.current(id))
    }

    fn list(&mut self) -> Result<Vec<BlueprintRecord>, StoreError> {
        let rows = lock_ignoring_poison(&self.shared.rows);
        let mut records: Vec<BlueprintRecord> = rows
            .records
            .values()
            .filter(|r| !self.writes.contains_key(&r.id))
            .chain(self.writes.values())
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn insert(&mut self, record: NewBlueprint) -> Result<BlueprintRecord, StoreError> {
        if self.lookup_name(&record.name).is_some() {
            return Err(StoreError::UniqueViolation { name: record.name });
        }

        let id = {
            let mut rows = lock_ignoring_poison(&self.shared.rows);
            rows.last_id += 1;
            rows.last_id
        };
        self.lock(LockKey::Id(id))?;

        let record = record.with_id(id);
        self.writes.insert(id, record.clone());
        Ok(record)
    }

    fn save(&mut self, record: &BlueprintRecord) -> Result<(), StoreError> {
        if self.current(record.id).is_none() {
            return Err(StoreError::MissingRow { id: record.id });
        }
        if self.find_name(&record.name, Some(record.id)).is_some() {
            return Err(StoreError::UniqueViolation {
                name: record.name.clone(),
            });
        }

        self.lock(LockKey::Id(record.id))?;
        self.writes.insert(record.id, record.clone());
        Ok(())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        let writes = std::mem::take(&mut self.writes);
        let mut rows = lock_ignoring_poison(&self.shared.rows);

        for record in writes.values() {
            let clash = rows
                .records
                .values()
                .any(|r| r.id != record.id && r.name == record.name && !writes.contains_key(&r.id));
            if clash {
                return Err(StoreError::UniqueViolation {
                    name: record.name.clone(),
                });
            }
        }

        rows.records.extend(writes);
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.locks.is_empty() {
            return;
        }
        let mut held = lock_ignoring_poison(&self.shared.held);
        for key in self.locks.drain(..) {
            held.remove(&key);
        }
        drop(held);
        self.shared.released.notify_all();
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
