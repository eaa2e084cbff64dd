//! SQLite-backed record store
//!
//! Each transaction opens its own connection and starts with
//! `BEGIN IMMEDIATE`, which takes SQLite's writer lock up front. That is
//! coarser than a row lock: every `RowLock::ForUpdate` read is covered by it,
//! and writers from other processes queue behind `busy_timeout`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, warn};

use super::{BlueprintStore, RowLock, StoreError, StoreTransaction, DEFAULT_LOCK_TIMEOUT};
use crate::core::entity::{BlueprintRecord, NewBlueprint};

/// Current schema version for migrations
const SCHEMA_VERSION: i32 = 1;

const COLUMNS: &str = "id, name, connection_type, vendor_pattern, model_pattern, \
                       version_pattern, template, status, created_at, updated_at";

const MAX_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

/// Blueprint store backed by a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Open or create the database, waiting up to `busy_timeout` for locks
    ///
    /// Timeouts beyond what SQLite supports (`i32::MAX` ms) are capped.
    pub fn open_with_timeout(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            path,
            busy_timeout: busy_timeout.min(MAX_BUSY_TIMEOUT),
        };
        let conn = store.connect()?;

        // Enable WAL mode so readers don't block the writer
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| map_error(e, "blueprint database"))?;
        init_schema(&conn)?;

        debug!(path = %store.path.display(), "opened blueprint database");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        -- Schema version for migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS blueprint (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            connection_type TEXT NOT NULL,
            vendor_pattern TEXT,
            model_pattern TEXT,
            version_pattern TEXT,
            template TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'DELETED')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CONSTRAINT blueprint_name_key UNIQUE (name)
        );
        CREATE INDEX IF NOT EXISTS idx_blueprint_status ON blueprint(status);
        "#,
    )
    .map_err(|e| map_error(e, "blueprint database"))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![SCHEMA_VERSION],
    )
    .map_err(|e| map_error(e, "blueprint database"))?;
    Ok(())
}

impl BlueprintStore for SqliteStore {
    type Transaction = SqliteTransaction;

    fn begin(&self) -> Result<SqliteTransaction, StoreError> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| map_error(e, "blueprint database"))?;
        Ok(SqliteTransaction {
            conn,
            finished: false,
        })
    }
}

/// Transaction over a [`SqliteStore`]
#[derive(Debug)]
pub struct SqliteTransaction {
    conn: Connection,
    finished: bool,
}

impl SqliteTransaction {
    fn query_one(
        &self,
        sql: &str,
        param: &dyn rusqlite::ToSql,
    ) -> Result<Option<BlueprintRecord>, StoreError> {
        self.conn
            .query_row(sql, [param], RawRow::read)
            .optional()?
            .map(RawRow::into_record)
            .transpose()
    }
}

impl StoreTransaction for SqliteTransaction {
    fn find_by_name(
        &mut self,
        name: &str,
        _lock: RowLock,
    ) -> Result<Option<BlueprintRecord>, StoreError> {
        let sql = format!("SELECT {} FROM blueprint WHERE name = ?1", COLUMNS);
        self.query_one(&sql, &name)
    }

    fn find_by_id(&mut self, id: i64, _lock: RowLock) -> Result<Option<BlueprintRecord>, StoreError> {
        let sql = format!("SELECT {} FROM blueprint WHERE id = ?1", COLUMNS);
        self.query_one(&sql, &id)
    }

    fn list(&mut self) -> Result<Vec<BlueprintRecord>, StoreError> {
        let sql = format!("SELECT {} FROM blueprint ORDER BY id", COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], RawRow::read)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    fn insert(&mut self, record: NewBlueprint) -> Result<BlueprintRecord, StoreError> {
        self.conn
            .execute(
                "INSERT INTO blueprint (name, connection_type, vendor_pattern, model_pattern,
                    version_pattern, template, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.name,
                    record.connection_type.as_str(),
                    record.vendor_pattern,
                    record.model_pattern,
                    record.version_pattern,
                    record.template,
                    record.status.as_str(),
                    format_timestamp(&record.created_at),
                    format_timestamp(&record.updated_at),
                ],
            )
            .map_err(|e| map_write_error(e, &record.name))?;

        let id = self.conn.last_insert_rowid();
        Ok(record.with_id(id))
    }

    fn save(&mut self, record: &BlueprintRecord) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE blueprint SET name = ?2, connection_type = ?3, vendor_pattern = ?4,
                    model_pattern = ?5, version_pattern = ?6, template = ?7, status = ?8,
                    updated_at = ?9
                 WHERE id = ?1",
                params![
                    record.id,
                    record.name,
                    record.connection_type.as_str(),
                    record.vendor_pattern,
                    record.model_pattern,
                    record.version_pattern,
                    record.template,
                    record.status.as_str(),
                    format_timestamp(&record.updated_at),
                ],
            )
            .map_err(|e| map_write_error(e, &record.name))?;

        if changed == 0 {
            return Err(StoreError::MissingRow { id: record.id });
        }
        Ok(())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| map_error(e, "blueprint database"))?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            warn!(error = %e, "failed to roll back blueprint transaction");
        }
    }
}

/// Raw column values before enum and timestamp parsing
struct RawRow {
    id: i64,
    name: String,
    connection_type: String,
    vendor_pattern: Option<String>,
    model_pattern: Option<String>,
    version_pattern: Option<String>,
    template: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl RawRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            connection_type: row.get(2)?,
            vendor_pattern: row.get(3)?,
            model_pattern: row.get(4)?,
            version_pattern: row.get(5)?,
            template: row.get(6)?,
            status: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<BlueprintRecord, StoreError> {
        Ok(BlueprintRecord {
            id: self.id,
            connection_type: self
                .connection_type
                .parse()
                .map_err(|message| StoreError::Corrupt { message })?,
            status: self
                .status
                .parse()
                .map_err(|message| StoreError::Corrupt { message })?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            name: self.name,
            vendor_pattern: self.vendor_pattern,
            model_pattern: self.model_pattern,
            version_pattern: self.version_pattern,
            template: self.template,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            message: format!("invalid timestamp '{}': {}", s, e),
        })
}

fn error_code(err: &rusqlite::Error) -> Option<ErrorCode> {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => Some(inner.code),
        _ => None,
    }
}

fn map_error(err: rusqlite::Error, resource: &str) -> StoreError {
    match error_code(&err) {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StoreError::LockTimeout {
            resource: resource.to_string(),
        },
        _ => StoreError::Database(err),
    }
}

fn map_write_error(err: rusqlite::Error, name: &str) -> StoreError {
    match error_code(&err) {
        Some(ErrorCode::ConstraintViolation) => StoreError::UniqueViolation {
            name: name.to_string(),
        },
        _ => map_error(err, "blueprint database"),
    }
}
