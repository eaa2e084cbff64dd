//! Blueprint lifecycle engine
//!
//! Owns the create/update/delete transitions of blueprint records. Every
//! operation runs in one store transaction and reads the rows it is about to
//! change with [`RowLock::ForUpdate`], so concurrent callers touching the same
//! name or id are serialized by the store. Validation always happens before
//! the single write of an operation; an error drops the transaction, which
//! rolls back.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use miette::Diagnostic;
use thiserror::Error;
use tracing::info;

use crate::core::entity::{BlueprintData, BlueprintRecord, Status};
use crate::core::identity::BlueprintId;
use crate::core::store::{BlueprintStore, RowLock, StoreError, StoreTransaction};
use crate::template::{TemplateError, TemplateValidator};

/// Last token handed out for an archival rename
static LAST_ARCHIVE_TOKEN: AtomicI64 = AtomicI64::new(0);

/// Errors raised by lifecycle operations
#[derive(Debug, Error, Diagnostic)]
pub enum BlueprintError {
    #[error("Blueprint with name '{name}' already exists")]
    #[diagnostic(code(blueprints::duplicate_name))]
    DuplicateName { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidTemplate(#[from] TemplateError),

    #[error("Blueprint '{reference}' does not exist")]
    #[diagnostic(code(blueprints::not_found))]
    NotFound { reference: String },

    #[error("Deleted blueprint '{reference}' cannot be {action}")]
    #[diagnostic(code(blueprints::already_deleted))]
    AlreadyDeleted {
        reference: String,
        action: &'static str,
    },

    #[error("Blueprint name cannot be changed (stored '{current}', requested '{requested}')")]
    #[diagnostic(
        code(blueprints::name_immutable),
        help("Delete the blueprint and create a new one to rename it")
    )]
    NameImmutable { current: String, requested: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

impl BlueprintError {
    /// Infrastructure contention the caller may retry
    pub fn is_transient(&self) -> bool {
        matches!(self, BlueprintError::Store(e) if e.is_transient())
    }

    fn not_found(reference: &str) -> Self {
        BlueprintError::NotFound {
            reference: reference.to_string(),
        }
    }
}

/// What an update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The stored blueprint already matched; nothing was written
    Unchanged,
}

/// Which records a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Active,
    All,
}

/// Lifecycle engine over a record store
#[derive(Debug)]
pub struct BlueprintService<S> {
    store: S,
    validator: TemplateValidator,
}

impl<S: BlueprintStore> BlueprintService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            validator: TemplateValidator::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `f` in one transaction: commit on `Ok`, roll back on `Err`
    pub fn in_transaction<T, F>(&self, f: F) -> Result<T, BlueprintError>
    where
        F: FnOnce(&mut Session<'_, S::Transaction>) -> Result<T, BlueprintError>,
    {
        let mut tx = self.store.begin()?;
        let value = f(&mut Session {
            tx: &mut tx,
            validator: &self.validator,
        })?;
        tx.commit()?;
        Ok(value)
    }

    /// Create a blueprint and return its external id
    pub fn create(&self, data: &BlueprintData) -> Result<BlueprintId, BlueprintError> {
        self.in_transaction(|session| session.create(data))
    }

    /// Update the blueprint with external id `id`
    pub fn update(&self, id: &str, data: &BlueprintData) -> Result<UpdateOutcome, BlueprintError> {
        self.in_transaction(|session| session.update(id, data))
    }

    /// Update the blueprint named `data.name`
    pub fn update_by_name(&self, data: &BlueprintData) -> Result<UpdateOutcome, BlueprintError> {
        self.in_transaction(|session| session.update_by_name(data))
    }

    /// Archive a blueprint, returning its transfer view from before the delete
    pub fn delete(&self, id: &str) -> Result<BlueprintData, BlueprintError> {
        self.in_transaction(|session| session.delete(id))
    }

    pub fn get(&self, id: &str) -> Result<BlueprintRecord, BlueprintError> {
        self.in_transaction(|session| session.get(id))
    }

    pub fn list(&self, filter: StatusFilter) -> Result<Vec<BlueprintRecord>, BlueprintError> {
        self.in_transaction(|session| session.list(filter))
    }
}

/// Lifecycle operations bound to an open transaction
///
/// Obtained through [`BlueprintService::in_transaction`]; several operations
/// on one session commit or roll back together.
pub struct Session<'a, T> {
    tx: &'a mut T,
    validator: &'a TemplateValidator,
}

impl<T: StoreTransaction> Session<'_, T> {
    pub fn create(&mut self, data: &BlueprintData) -> Result<BlueprintId, BlueprintError> {
        info!(name = %data.name, "creating blueprint");

        if self.tx.find_by_name(&data.name, RowLock::ForUpdate)?.is_some() {
            return Err(BlueprintError::DuplicateName {
                name: data.name.clone(),
            });
        }
        self.validator.validate(&data.template)?;

        let record = self.tx.insert(data.to_new_record(Utc::now()))?;
        let id = record.blueprint_id();
        info!(%id, "created blueprint");
        Ok(id)
    }

    pub fn update(&mut self, id: &str, data: &BlueprintData) -> Result<UpdateOutcome, BlueprintError> {
        info!(id, name = %data.name, "updating blueprint");

        let current = self.find_locked(id)?;
        if current.is_deleted() {
            return Err(BlueprintError::AlreadyDeleted {
                reference: id.to_string(),
                action: "updated",
            });
        }
        if current.name != data.name {
            return Err(BlueprintError::NameImmutable {
                current: current.name,
                requested: data.name.clone(),
            });
        }
        self.apply_update(current, data)
    }

    pub fn update_by_name(&mut self, data: &BlueprintData) -> Result<UpdateOutcome, BlueprintError> {
        info!(name = %data.name, "updating blueprint by name");

        let current = self
            .tx
            .find_by_name(&data.name, RowLock::ForUpdate)?
            .ok_or_else(|| BlueprintError::not_found(&data.name))?;
        if current.is_deleted() {
            return Err(BlueprintError::AlreadyDeleted {
                reference: data.name.clone(),
                action: "updated",
            });
        }
        self.apply_update(current, data)
    }

    fn apply_update(
        &mut self,
        mut current: BlueprintRecord,
        data: &BlueprintData,
    ) -> Result<UpdateOutcome, BlueprintError> {
        let id = current.blueprint_id();
        if current.to_data() == *data {
            info!(%id, "blueprint does not require update");
            return Ok(UpdateOutcome::Unchanged);
        }
        if current.template != data.template {
            self.validator.validate(&data.template)?;
        }

        current.apply(data);
        current.updated_at = Utc::now();
        self.tx.save(&current)?;
        info!(%id, "updated blueprint");
        Ok(UpdateOutcome::Updated)
    }

    pub fn delete(&mut self, id: &str) -> Result<BlueprintData, BlueprintError> {
        info!(id, "deleting blueprint");

        let mut current = self.find_locked(id)?;
        if current.is_deleted() {
            return Err(BlueprintError::AlreadyDeleted {
                reference: id.to_string(),
                action: "deleted",
            });
        }

        let before = current.to_data();
        current.status = Status::Deleted;
        current.name = archived_name(&current.name);
        current.updated_at = Utc::now();
        self.tx.save(&current)?;

        info!(id, archived_as = %current.name, "deleted blueprint");
        Ok(before)
    }

    /// Read a record without locking it; deleted records are included
    pub fn get(&mut self, id: &str) -> Result<BlueprintRecord, BlueprintError> {
        let row_id = resolve(id)?;
        self.tx
            .find_by_id(row_id, RowLock::Unlocked)?
            .ok_or_else(|| BlueprintError::not_found(id))
    }

    pub fn list(&mut self, filter: StatusFilter) -> Result<Vec<BlueprintRecord>, BlueprintError> {
        let mut records = self.tx.list()?;
        if filter == StatusFilter::Active {
            records.retain(|r| !r.is_deleted());
        }
        Ok(records)
    }

    /// Whether a record currently carries `name`, locking the name slot
    pub fn exists(&mut self, name: &str) -> Result<bool, BlueprintError> {
        Ok(self.tx.find_by_name(name, RowLock::ForUpdate)?.is_some())
    }

    fn find_locked(&mut self, id: &str) -> Result<BlueprintRecord, BlueprintError> {
        let row_id = resolve(id)?;
        self.tx
            .find_by_id(row_id, RowLock::ForUpdate)?
            .ok_or_else(|| BlueprintError::not_found(id))
    }
}

/// Unparsable ids are reported the same way as unknown ones
fn resolve(id: &str) -> Result<i64, BlueprintError> {
    BlueprintId::parse(id)
        .map(|id| id.row_id())
        .map_err(|_| BlueprintError::not_found(id))
}

/// Name an archived record takes so its original name becomes free
///
/// The suffix is a nanosecond timestamp, bumped past the last one handed out
/// so two archivals in this process never share it.
pub fn archived_name(name: &str) -> String {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let bump = |last: i64| now.max(last.saturating_add(1));
    let token = match LAST_ARCHIVE_TOKEN.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(bump(last))
    }) {
        Ok(previous) | Err(previous) => bump(previous),
    };
    format!("{}__{}", name, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::ConnectionType;
    use crate::core::store::{MemoryStore, SqliteStore};
    use regex::Regex;
    use std::sync::Barrier;
    use std::thread;
    use tempfile::tempdir;

    fn service() -> BlueprintService<MemoryStore> {
        BlueprintService::new(MemoryStore::new())
    }

    fn blueprint(name: &str) -> BlueprintData {
        BlueprintData::new(name, ConnectionType::Cli, "{}")
    }

    #[test]
    fn test_create_new_blueprint() {
        let service = service();
        let data = blueprint("Test Blueprint")
            .with_version_pattern("1.0")
            .with_vendor_pattern("Vendor");

        let id = service.create(&data).unwrap();
        let saved = service.get(&id.to_string()).unwrap();

        assert_eq!(saved.to_data(), data);
        assert_eq!(saved.status, Status::Active);
        assert!(saved.id > 0);
        assert_eq!(saved.created_at, saved.updated_at);
        assert!(id.to_string().starts_with("blueprint/"));
    }

    #[test]
    fn test_create_duplicate_blueprint() {
        let service = service();
        service.create(&blueprint("Test Blueprint")).unwrap();

        let err = service.create(&blueprint("Test Blueprint")).unwrap_err();
        assert!(matches!(err, BlueprintError::DuplicateName { ref name } if name == "Test Blueprint"));
        assert_eq!(service.list(StatusFilter::All).unwrap().len(), 1);
    }

    #[test]
    fn test_create_with_invalid_template_writes_nothing() {
        let service = service();

        let malformed = BlueprintData::new("Test Blueprint", ConnectionType::Cli, "{");
        let err = service.create(&malformed).unwrap_err();
        assert!(matches!(err, BlueprintError::InvalidTemplate(TemplateError::Malformed(_))));

        let unsupported =
            BlueprintData::new("Test Blueprint", ConnectionType::Cli, r#"{"a": "{{<BAD> a}}"}"#);
        let err = service.create(&unsupported).unwrap_err();
        assert!(matches!(
            err,
            BlueprintError::InvalidTemplate(TemplateError::UnsupportedVariableType { .. })
        ));

        assert!(service.store().is_empty());
    }

    #[test]
    fn test_concurrent_creates_with_same_name() {
        let service = service();
        let threads = 8;
        let barrier = Barrier::new(threads);

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        service.create(&blueprint("race"))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let created = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(BlueprintError::DuplicateName { .. })))
            .count();
        assert_eq!(created, 1);
        assert_eq!(duplicates, threads - 1);
        assert_eq!(service.list(StatusFilter::All).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_existing_blueprint() {
        let service = service();
        let data = BlueprintData::new("test", ConnectionType::Cli, r#"{"address":"192.168.10.1"}"#);
        let id = service.create(&data).unwrap().to_string();
        let before_removal = Utc::now();

        let returned = service.delete(&id).unwrap();
        assert_eq!(returned, data);

        let deleted = service.get(&id).unwrap();
        assert_eq!(deleted.status, Status::Deleted);
        assert!(Regex::new(r"^test__\d+$").unwrap().is_match(&deleted.name));
        assert_eq!(deleted.template, data.template);
        assert!(deleted.updated_at >= before_removal);
    }

    #[test]
    fn test_delete_frees_the_name() {
        let service = service();
        let first = service.create(&blueprint("cli")).unwrap().to_string();
        service.delete(&first).unwrap();

        let second = service.create(&blueprint("cli")).unwrap().to_string();
        assert_ne!(first, second);
        service.delete(&second).unwrap();

        // both archives coexist under distinct names
        let all = service.list(StatusFilter::All).unwrap();
        assert_eq!(all.len(), 2);
        assert_ne!(all[0].name, all[1].name);
        assert!(service.list(StatusFilter::Active).unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_or_malformed_id() {
        let service = service();
        for id in ["blueprint/1", "blueprint/abc", "garbage"] {
            let err = service.delete(id).unwrap_err();
            assert!(matches!(err, BlueprintError::NotFound { .. }), "{id}");
        }
    }

    #[test]
    fn test_delete_already_deleted_blueprint() {
        let service = service();
        let id = service.create(&blueprint("Test Blueprint")).unwrap().to_string();
        service.delete(&id).unwrap();
        let archived = service.get(&id).unwrap();

        let err = service.delete(&id).unwrap_err();
        assert!(matches!(err, BlueprintError::AlreadyDeleted { .. }));
        assert_eq!(service.get(&id).unwrap(), archived);
    }

    #[test]
    fn test_update_existing_blueprint() {
        let service = service();
        let data = blueprint("Test Blueprint");
        let id = service.create(&data).unwrap().to_string();
        let created = service.get(&id).unwrap();

        let mut changed = data.clone();
        changed.template = r#"{"updated": true}"#.to_string();
        changed.connection_type = ConnectionType::Netconf;
        changed.model_pattern = Some("MX.*".to_string());

        assert_eq!(service.update(&id, &changed).unwrap(), UpdateOutcome::Updated);

        let updated = service.get(&id).unwrap();
        assert_eq!(updated.to_data(), changed);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_update_deleted_blueprint() {
        let service = service();
        let data = blueprint("Test Blueprint");
        let id = service.create(&data).unwrap().to_string();
        service.delete(&id).unwrap();

        let mut changed = data.clone();
        changed.template = r#"{"updated": true}"#.to_string();
        let err = service.update(&id, &changed).unwrap_err();
        assert!(matches!(err, BlueprintError::AlreadyDeleted { .. }));

        // the original transfer is no longer equal to the archived record either
        let err = service.update(&id, &data).unwrap_err();
        assert!(matches!(err, BlueprintError::AlreadyDeleted { .. }));
    }

    #[test]
    fn test_update_blueprint_name_is_rejected() {
        let service = service();
        let data = blueprint("Test Blueprint");
        let id = service.create(&data).unwrap().to_string();

        let mut renamed = data.clone();
        renamed.name = "Updated Blueprint".to_string();
        let err = service.update(&id, &renamed).unwrap_err();
        assert!(matches!(err, BlueprintError::NameImmutable { .. }));

        // still rejected when other fields change too
        renamed.template = r#"{"x": 1}"#.to_string();
        let err = service.update(&id, &renamed).unwrap_err();
        assert!(matches!(err, BlueprintError::NameImmutable { .. }));
        assert_eq!(service.get(&id).unwrap().to_data(), data);
    }

    #[test]
    fn test_identical_update_is_a_no_op() {
        let service = service();

        // seed a record whose template would no longer pass validation
        let data = BlueprintData::new("legacy", ConnectionType::Snmp, r#"{"a": "{{<BAD> x}}"}"#);
        let id = {
            let mut tx = service.store().begin().unwrap();
            let record = tx.insert(data.to_new_record(Utc::now())).unwrap();
            tx.commit().unwrap();
            record.blueprint_id().to_string()
        };
        let before = service.get(&id).unwrap();

        assert_eq!(service.update(&id, &data).unwrap(), UpdateOutcome::Unchanged);
        assert_eq!(service.update_by_name(&data).unwrap(), UpdateOutcome::Unchanged);
        assert_eq!(service.get(&id).unwrap().updated_at, before.updated_at);
    }

    #[test]
    fn test_update_with_invalid_template_leaves_record() {
        let service = service();
        let data = blueprint("cli");
        let id = service.create(&data).unwrap().to_string();

        let mut changed = data.clone();
        changed.template = r#"{"port": "{{<PORT> p}}"}"#.to_string();
        let err = service.update(&id, &changed).unwrap_err();
        assert!(matches!(err, BlueprintError::InvalidTemplate(_)));
        assert_eq!(service.get(&id).unwrap().to_data(), data);
    }

    #[test]
    fn test_update_without_template_change_skips_validation() {
        let service = service();
        let data = BlueprintData::new("legacy", ConnectionType::Snmp, r#"{"a": "{{<BAD> x}}"}"#);
        let id = {
            let mut tx = service.store().begin().unwrap();
            let record = tx.insert(data.to_new_record(Utc::now())).unwrap();
            tx.commit().unwrap();
            record.blueprint_id().to_string()
        };

        let changed = data.clone().with_vendor_pattern("Acme");
        assert_eq!(service.update(&id, &changed).unwrap(), UpdateOutcome::Updated);
    }

    #[test]
    fn test_update_unknown_blueprint() {
        let service = service();
        let err = service.update("blueprint/42", &blueprint("x")).unwrap_err();
        assert!(matches!(err, BlueprintError::NotFound { .. }));

        let err = service.update_by_name(&blueprint("x")).unwrap_err();
        assert!(matches!(err, BlueprintError::NotFound { .. }));
    }

    #[test]
    fn test_update_by_name() {
        let service = service();
        let data = blueprint("gnmi");
        let id = service.create(&data).unwrap().to_string();

        let mut changed = data.clone();
        changed.connection_type = ConnectionType::Gnmi;
        assert_eq!(service.update_by_name(&changed).unwrap(), UpdateOutcome::Updated);
        assert_eq!(service.get(&id).unwrap().connection_type, ConnectionType::Gnmi);
    }

    #[test]
    fn test_failed_operation_in_transaction_rolls_back_all() {
        let service = service();
        let result = service.in_transaction(|session| {
            session.create(&blueprint("a"))?;
            session.create(&blueprint("a"))
        });

        assert!(matches!(result, Err(BlueprintError::DuplicateName { .. })));
        assert!(service.store().is_empty());
    }

    #[test]
    fn test_lock_timeout_is_transient() {
        let service = BlueprintService::new(MemoryStore::with_lock_timeout(
            std::time::Duration::from_millis(50),
        ));
        let id = service.create(&blueprint("cli")).unwrap().to_string();

        let mut holder = service.store().begin().unwrap();
        holder.find_by_name("cli", RowLock::ForUpdate).unwrap();

        let err = service.delete(&id).unwrap_err();
        assert!(err.is_transient());
        drop(holder);

        assert!(service.delete(&id).is_ok());
    }

    #[test]
    fn test_archived_names_are_distinct() {
        let names: Vec<String> = (0..100).map(|_| archived_name("x")).collect();
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_lifecycle_on_sqlite() {
        let tmp = tempdir().unwrap();
        let service = BlueprintService::new(SqliteStore::open(tmp.path().join("bp.db")).unwrap());
        let data = BlueprintData::new("test", ConnectionType::Cli, r#"{"address":"192.168.10.1"}"#);

        let id = service.create(&data).unwrap().to_string();
        assert_eq!(service.get(&id).unwrap().to_data(), data);
        assert!(matches!(
            service.create(&data).unwrap_err(),
            BlueprintError::DuplicateName { .. }
        ));

        let returned = service.delete(&id).unwrap();
        assert_eq!(returned.name, "test");
        let archived = service.get(&id).unwrap();
        assert!(Regex::new(r"^test__\d+$").unwrap().is_match(&archived.name));

        // the name is free again
        service.create(&data).unwrap();
        assert_eq!(service.list(StatusFilter::Active).unwrap().len(), 1);
        assert_eq!(service.list(StatusFilter::All).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_creates_on_sqlite() {
        let tmp = tempdir().unwrap();
        let service = BlueprintService::new(SqliteStore::open(tmp.path().join("bp.db")).unwrap());
        let threads = 4;
        let barrier = Barrier::new(threads);

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        service.create(&blueprint("race"))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(BlueprintError::DuplicateName { .. }))));
    }
}
